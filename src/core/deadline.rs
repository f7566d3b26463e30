//! tick 预算截止时间
//!
//! 预算只在步骤之间检查：已经发出的调用（尤其是平台变更）不会被中途取消，
//! 它们各自受 Step 超时约束；截止时间一过，就不再开始新的步骤。

use std::time::Duration;

use tokio::time::Instant;

use crate::core::AgentError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn passed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// 开始 `next_step` 之前调用；截止时间已过返回 TickBudgetExceeded
    pub fn check(&self, next_step: &str) -> Result<(), AgentError> {
        if self.passed() {
            tracing::warn!(
                next_step,
                budget_ms = self.budget.as_millis() as u64,
                "tick budget exhausted, not starting next step"
            );
            return Err(AgentError::TickBudgetExceeded(self.budget.as_secs()));
        }
        Ok(())
    }
}

/// 没有截止时间时总是放行
pub fn check_opt(deadline: Option<&Deadline>, next_step: &str) -> Result<(), AgentError> {
    deadline.map_or(Ok(()), |d| d.check(next_step))
}

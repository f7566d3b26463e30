//! 约束闸门：纯函数，按固定优先级检查快照，第一个不通过的检查直接给出 wait 结论

use serde::Serialize;

use super::Decision;
use crate::core::state::{ApiStatus, SystemState};

/// 发帖限额
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingLimits {
    pub max_posts_per_day: u32,
}

impl Default for PostingLimits {
    fn default() -> Self {
        Self {
            max_posts_per_day: 5,
        }
    }
}

/// 闸门结论：总是等待
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub reason: String,
    pub confidence: f64,
}

impl Verdict {
    fn new(reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            reason: reason.into(),
            confidence,
        }
    }

    pub fn into_decision(self) -> Decision {
        Decision::wait(self.reason, self.confidence, "policy_blocked")
    }
}

/// 依次检查：快照缺失 → 账号缺失 → 今日发帖达上限 → 健康检查 → API 状态 → 限流。
/// 全部通过返回 None。
pub fn evaluate(state: Option<&SystemState>, limits: &PostingLimits) -> Option<Verdict> {
    let Some(state) = state else {
        return Some(Verdict::new("System state unavailable", 0.6));
    };
    let Some(account) = state.account.as_ref() else {
        return Some(Verdict::new("Account state unavailable", 0.7));
    };
    if account.posts_today >= limits.max_posts_per_day {
        return Some(Verdict::new(
            format!(
                "Daily post limit reached ({}/{})",
                account.posts_today, limits.max_posts_per_day
            ),
            0.9,
        ));
    }
    if !state.system.healthy {
        return Some(Verdict::new("System health check failed", 0.7));
    }
    if state.system.api_status == ApiStatus::Error {
        return Some(Verdict::new("Platform API status is error", 0.8));
    }
    if !state.system.rate_limits_ok {
        return Some(Verdict::new("Rate limits exhausted", 0.7));
    }
    None
}

/// 闸门放行时交回快照的所有权，否则给出结论
pub fn admit(state: Option<SystemState>, limits: &PostingLimits) -> Result<SystemState, Verdict> {
    match (evaluate(state.as_ref(), limits), state) {
        (None, Some(state)) => Ok(state),
        (Some(verdict), _) => Err(verdict),
        (None, None) => Err(Verdict::new("System state unavailable", 0.6)),
    }
}

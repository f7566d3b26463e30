//! 单次 tick 编排：开启周期 → 采集状态 → 约束闸门 → 学习上下文 → 决策 → 执行 → 保存结果 → 写回学习数据
//!
//! 只有平台变更失败、周期持久化失败和超出 tick 预算会以 Err 返回；
//! 其余失败都在各步骤内部按既定策略降级。预算耗尽时已保存的结果是失败信封，
//! 已发出的平台变更不受预算影响。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::actions::{ActionExecutors, ActionOutcome, TickContext};
use crate::config::Timeouts;
use crate::core::state::{collect_system_state, SystemState};
use crate::core::deadline::{check_opt, Deadline};
use crate::core::{AgentError, Step};
use crate::cycle::{CycleHandle, CycleStore};
use crate::decision::{
    admit, ActionKind, Decision, DecisionInput, DecisionOracle, DecisionSource, PostingLimits,
};
use crate::memory::LearningBlender;
use crate::platform::SocialPlatform;

/// 一次 tick 的结果
#[derive(Debug, Clone)]
pub struct TickReport {
    pub cycle_id: String,
    pub decision: Decision,
    pub source: DecisionSource,
    pub outcome: ActionOutcome,
}

pub struct Pipeline {
    oracle: DecisionOracle,
    executors: ActionExecutors,
    limits: PostingLimits,
}

impl Pipeline {
    pub fn new(oracle: DecisionOracle, executors: ActionExecutors, limits: PostingLimits) -> Self {
        Self {
            oracle,
            executors,
            limits,
        }
    }

    pub fn executors(&self) -> &ActionExecutors {
        &self.executors
    }

    fn platform(&self) -> &Arc<dyn SocialPlatform> {
        &self.executors.platform
    }

    fn cycles(&self) -> &Arc<dyn CycleStore> {
        &self.executors.cycles
    }

    fn learning(&self) -> &Arc<LearningBlender> {
        &self.executors.learning
    }

    fn timeouts(&self) -> Timeouts {
        self.executors.settings.timeouts
    }

    /// 完整 tick：状态由平台账号信息与周期存档采集
    pub async fn run_tick(&self) -> Result<TickReport, AgentError> {
        self.run_tick_until(None).await
    }

    /// 使用调用方提供的快照（None 表示状态不可用）
    pub async fn run_tick_with_state(
        &self,
        state: Option<SystemState>,
    ) -> Result<TickReport, AgentError> {
        let handle = self.open_cycle().await?;
        self.run_cycle(handle, state, None).await
    }

    /// 整个 tick 受 budget 约束：截止时间在步骤之间检查，过期后不再开始新步骤。
    /// 已发出的调用只受各自的超时约束，已发出的平台变更照常保存结果。
    pub async fn run_tick_within(&self, budget: Duration) -> Result<TickReport, AgentError> {
        self.run_tick_until(Some(Deadline::after(budget))).await
    }

    async fn run_tick_until(&self, deadline: Option<Deadline>) -> Result<TickReport, AgentError> {
        let handle = self.open_cycle().await?;
        if let Err(e) = check_opt(deadline.as_ref(), "collect_state") {
            return Err(self.abandon(&handle, ActionKind::Wait, e).await);
        }
        let state = collect_system_state(
            self.platform().as_ref(),
            self.cycles().as_ref(),
            self.timeouts().platform,
        )
        .await;
        self.run_cycle(handle, Some(state), deadline).await
    }

    /// 分析不占用周期：结果单独落盘；scheduled 时顺带归档当前周期
    pub async fn run_analysis(&self, scheduled: bool) -> Result<ActionOutcome, AgentError> {
        if scheduled {
            self.executors.analyze_scheduled().await
        } else {
            self.executors.analyze().await
        }
    }

    async fn open_cycle(&self) -> Result<CycleHandle, AgentError> {
        let handle = Step::persistence("initialize_cycle", self.timeouts().platform)
            .run(self.cycles().initialize_cycle())
            .await?;
        tracing::info!(cycle_id = %handle.id(), "cycle opened");
        Ok(handle)
    }

    /// 放弃本次 tick：尽力保存失败结果后原样返回错误
    async fn abandon(&self, handle: &CycleHandle, action: ActionKind, e: AgentError) -> AgentError {
        tracing::error!(cycle_id = %handle.id(), action = %action, error = %e, "tick abandoned");
        let failed = ActionOutcome::failed(action.into(), e.to_string());
        Step::persistence("save_failed_outcome", self.timeouts().platform)
            .best_effort(self.cycles().save_action_outcome(handle, &failed))
            .await;
        e
    }

    async fn run_cycle(
        &self,
        handle: CycleHandle,
        state: Option<SystemState>,
        deadline: Option<Deadline>,
    ) -> Result<TickReport, AgentError> {
        let (decision, source, learning) = match admit(state, &self.limits) {
            Err(verdict) => {
                let reason = verdict.reason.clone();
                let source = DecisionSource::Gated(reason);
                if let Some(diagnostic) = source.diagnostic() {
                    tracing::info!(diagnostic = %diagnostic, "constraint gate blocked tick");
                }
                (verdict.into_decision(), source, None)
            }
            Ok(state) => {
                if let Err(e) = check_opt(deadline.as_ref(), "decision") {
                    return Err(self.abandon(&handle, ActionKind::Wait, e).await);
                }
                let learning = self.learning().blend().await;
                let input = DecisionInput {
                    timestamp: Utc::now(),
                    state,
                    learning: Some(learning.clone()),
                };
                let (decision, source) = self.oracle.decide_with_source(&input).await;
                (decision, source, Some(learning))
            }
        };
        tracing::info!(
            cycle_id = %handle.id(),
            action = %decision.action(),
            confidence = decision.confidence(),
            source = ?source,
            "decision made"
        );

        if let Err(e) = check_opt(deadline.as_ref(), "dispatch") {
            return Err(self.abandon(&handle, decision.action(), e).await);
        }
        let ctx = TickContext::new(learning, deadline);
        let outcome = match self.executors.dispatch_in(&decision, &ctx).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abandon(&handle, decision.action(), e).await),
        };

        Step::persistence("save_action_outcome", self.timeouts().platform)
            .run(self.cycles().save_action_outcome(&handle, &outcome))
            .await?;

        if outcome.success && !outcome.is_wait() {
            Step::persistence("record_learning", self.timeouts().platform)
                .best_effort(self.learning().source().record_outcome(&outcome))
                .await;
        }

        if deadline.is_some_and(|d| d.passed()) {
            tracing::warn!(cycle_id = %handle.id(), action = %outcome.action, "tick overran its budget; outcome kept");
        }
        tracing::info!(
            cycle_id = %handle.id(),
            action = %outcome.action,
            success = outcome.success,
            "tick finished"
        );
        Ok(TickReport {
            cycle_id: handle.id().to_string(),
            decision,
            source,
            outcome,
        })
    }
}

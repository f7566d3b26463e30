//! 流水线错误分类
//!
//! 只有 PlatformMutation（以及周期协调器的持久化失败）会从 tick 中向上抛出；
//! 其余类别都在本地按既定降级策略处理，只作为诊断标签出现在日志与 `DecisionSource::diagnostic` 中。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 约束闸门直接给出结论（总是以 wait 决策呈现）
    #[error("Policy blocked: {0}")]
    PolicyBlocked(String),

    /// 决策 / 打分 / 生成服务超时或传输失败
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// 外部服务返回了无法解析或不符合 schema 的内容
    #[error("Malformed oracle response: {0}")]
    MalformedOracleResponse(String),

    /// 搜索 + 过滤后没有可用候选
    #[error("No candidates: {0}")]
    NoCandidates(String),

    /// 平台变更调用失败（发帖 / 转发 / 点赞 / 引用 / 关注），必须对上游可见
    #[error("{0}")]
    PlatformMutation(String),

    /// best-effort 的补充步骤失败（参考时间线、话题搜索、互动快照等）
    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// 单次 tick 超出总预算
    #[error("Tick exceeded budget of {0}s")]
    TickBudgetExceeded(u64),
}

impl AgentError {
    /// 是否应当越过 tick 边界向上传播
    pub fn propagates(&self) -> bool {
        matches!(
            self,
            AgentError::PlatformMutation(_)
                | AgentError::Persistence(_)
                | AgentError::TickBudgetExceeded(_)
        )
    }
}

//! 决策服务适配：组装上下文 → 调用 LLM（带超时）→ 解析校验 → 必要时降级
//!
//! 调用失败 / 超时 / 无法解析 → wait（confidence 0.5，reason scheduled_wait）；
//! 解析成功但不合规 → wait（confidence 0.6，reasoning "Invalid decision format"）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::{schema_for, JsonSchema};
use serde_json::json;

use super::{parse_decision, ActionKind, Decision, OracleParse};
use crate::core::state::SystemState;
use crate::core::{AgentError, Step};
use crate::llm::{LlmClient, Message};
use crate::memory::LearningContext;

const DECISION_INSTRUCTION: &str = "You are the decision engine of an autonomous social media account. \
Choose exactly ONE action for this tick from: post, retweet, quote_tweet, like, follow, wait.\n\
- post: publish an original post (parameters.topic optional)\n\
- retweet: amplify someone else's post (parameters.query required)\n\
- quote_tweet: quote a post with commentary (parameters.query required)\n\
- like: like a relevant post (parameters.query required)\n\
- follow: follow an expert account (parameters.query required)\n\
- wait: do nothing this tick (parameters.duration in minutes)\n\
Reply with ONLY one JSON object matching the schema below, no Markdown or extra text.";

/// 决策 JSON 格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DecisionFormat {
    /// 本次 tick 执行的动作
    action: ActionKind,
    /// 选择该动作的理由，不能为空
    reasoning: String,
    /// 0 到 1 之间的置信度
    confidence: f64,
    /// 动作参数，如 query、topic、duration
    parameters: HashMap<String, serde_json::Value>,
}

/// 决策 JSON Schema 字符串，拼入 prompt
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 决策输入：时间戳、状态快照、可选的学习上下文
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub timestamp: DateTime<Utc>,
    pub state: SystemState,
    pub learning: Option<LearningContext>,
}

/// 决策来源，仅用于诊断；调用方不应据此分支
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionSource {
    /// 约束闸门拦截，未调用决策服务
    Gated(String),
    Oracle,
    Unavailable(String),
    ParseError(String),
    SchemaError(String),
}

impl DecisionSource {
    /// 降级来源对应的错误类别；决策服务正常给出时为 None
    pub fn diagnostic(&self) -> Option<AgentError> {
        match self {
            DecisionSource::Oracle => None,
            DecisionSource::Gated(reason) => Some(AgentError::PolicyBlocked(reason.clone())),
            DecisionSource::Unavailable(e) => Some(AgentError::OracleUnavailable(e.clone())),
            DecisionSource::ParseError(e) | DecisionSource::SchemaError(e) => {
                Some(AgentError::MalformedOracleResponse(e.clone()))
            }
        }
    }
}

pub struct DecisionOracle {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl DecisionOracle {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// system = 固定指令 + schema；user = 序列化的上下文
    pub fn build_messages(input: &DecisionInput) -> Vec<Message> {
        let system = format!("{}\n\nSchema:\n{}", DECISION_INSTRUCTION, decision_schema_json());
        let mut context = json!({
            "timestamp": input.timestamp.to_rfc3339(),
            "account": input.state.account,
            "system": input.state.system,
            "market": input.state.market,
        });
        if let Some(learning) = &input.learning {
            context["learning"] = json!(learning);
        }
        let user = format!(
            "Current context:\n{}\n\nDecide the next action.",
            serde_json::to_string_pretty(&context).unwrap_or_default()
        );
        vec![Message::system(system), Message::user(user)]
    }

    pub async fn decide(&self, input: &DecisionInput) -> Decision {
        self.decide_with_source(input).await.0
    }

    pub async fn decide_with_source(&self, input: &DecisionInput) -> (Decision, DecisionSource) {
        let messages = Self::build_messages(input);
        let raw = match Step::oracle("decision", self.timeout)
            .run(self.llm.complete(&messages))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "decision service failed, falling back to scheduled wait");
                let message = match e {
                    AgentError::OracleUnavailable(message) => message,
                    other => other.to_string(),
                };
                return (unavailable_fallback(), DecisionSource::Unavailable(message));
            }
        };
        tracing::debug!(raw = %raw, "decision service raw output");

        let parsed = parse_decision(&raw);
        tracing::info!(tag = parsed.tag(), "decision parsed");
        match parsed {
            OracleParse::Parsed(decision) => (decision, DecisionSource::Oracle),
            OracleParse::ParseError(e) => {
                tracing::warn!(error = %e, "decision output not parseable");
                (unavailable_fallback(), DecisionSource::ParseError(e))
            }
            OracleParse::SchemaError(e) => {
                tracing::warn!(error = %e, "decision output failed validation");
                (invalid_format_fallback(), DecisionSource::SchemaError(e))
            }
        }
    }
}

/// 服务不可用或输出无法解析
pub fn unavailable_fallback() -> Decision {
    Decision::wait(
        "Decision service unavailable; scheduled wait",
        0.5,
        "scheduled_wait",
    )
}

/// 输出可解析但不合规
pub fn invalid_format_fallback() -> Decision {
    Decision::wait("Invalid decision format", 0.6, "invalid_decision_format")
}

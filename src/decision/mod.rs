//! 决策层：约束闸门、决策服务适配、输出解析与校验
//!
//! 每个 tick 恰好产出一个 Decision；无论外部服务成功、超时还是返回垃圾，
//! 调用方拿到的 Decision 形状完全一致，不需要区分是否走了降级。

pub mod gate;
pub mod oracle;
pub mod parse;

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use gate::{admit, evaluate, PostingLimits, Verdict};
pub use oracle::{DecisionInput, DecisionOracle, DecisionSource};
pub use parse::{parse_decision, OracleParse};

/// 等待类降级决策的默认时长（分钟）
pub const FALLBACK_WAIT_MINUTES: u64 = 30;

/// 决策可选的动作（封闭集合，分发处穷尽匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Post,
    Retweet,
    QuoteTweet,
    Like,
    Follow,
    Wait,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Post,
        ActionKind::Retweet,
        ActionKind::QuoteTweet,
        ActionKind::Like,
        ActionKind::Follow,
        ActionKind::Wait,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Post => "post",
            ActionKind::Retweet => "retweet",
            ActionKind::QuoteTweet => "quote_tweet",
            ActionKind::Like => "like",
            ActionKind::Follow => "follow",
            ActionKind::Wait => "wait",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 经过校验的决策；只能通过 `new` / `wait` 构造，构造后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    action: ActionKind,
    reasoning: String,
    confidence: f64,
    parameters: Map<String, Value>,
}

impl Decision {
    /// reasoning 为空时报错；confidence 夹到 [0, 1]
    pub fn new(
        action: ActionKind,
        reasoning: impl Into<String>,
        confidence: f64,
        parameters: Map<String, Value>,
    ) -> Result<Self, String> {
        let reasoning = reasoning.into();
        if reasoning.trim().is_empty() {
            return Err("reasoning must not be empty".to_string());
        }
        Ok(Self {
            action,
            reasoning: reasoning.trim().to_string(),
            confidence: clamp_unit(confidence),
            parameters,
        })
    }

    /// 等待决策；parameters 至少带上 duration（分钟）
    pub fn wait(reasoning: impl Into<String>, confidence: f64, reason_code: &str) -> Self {
        let reasoning = reasoning.into();
        let mut parameters = Map::new();
        parameters.insert("duration".into(), Value::from(FALLBACK_WAIT_MINUTES));
        parameters.insert("reason".into(), Value::from(reason_code));
        Self {
            action: ActionKind::Wait,
            reasoning: if reasoning.trim().is_empty() {
                "wait".to_string()
            } else {
                reasoning
            },
            confidence: clamp_unit(confidence),
            parameters,
        }
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// 字符串参数；去除首尾空白后为空视为缺失
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn query(&self) -> Option<&str> {
        self.param_str("query")
    }

    pub fn topic(&self) -> Option<&str> {
        self.param_str("topic")
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

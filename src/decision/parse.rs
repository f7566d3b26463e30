//! 决策服务输出的解析与校验
//!
//! 结果打上标签：Parsed / ParseError（无 JSON 或 JSON 非法）/ SchemaError（JSON 合法但字段不合规），
//! 由 oracle 在边界处折叠成统一的降级决策，标签保留用于日志诊断。

use serde_json::Value;

use super::{ActionKind, Decision};
use crate::llm::parse_json_object;

/// confidence 缺失或非数值时的默认值
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// 带标签的解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum OracleParse<T> {
    Parsed(T),
    ParseError(String),
    SchemaError(String),
}

impl<T> OracleParse<T> {
    pub fn tag(&self) -> &'static str {
        match self {
            OracleParse::Parsed(_) => "parsed",
            OracleParse::ParseError(_) => "parse_error",
            OracleParse::SchemaError(_) => "schema_error",
        }
    }
}

/// 从原始文本中取第一个 JSON 对象并校验为 Decision
///
/// 校验规则：action 必须是合法动作名；reasoning 必须是非空字符串；parameters 必须是对象。
/// confidence 夹到 [0, 1]，缺失或非数值时取 DEFAULT_CONFIDENCE。
pub fn parse_decision(raw: &str) -> OracleParse<Decision> {
    let value = match parse_json_object(raw) {
        Ok(v) => v,
        Err(e) => return OracleParse::ParseError(e),
    };

    let action = match value.get("action").and_then(Value::as_str) {
        Some(name) => match ActionKind::parse(name.trim()) {
            Some(action) => action,
            None => return OracleParse::SchemaError(format!("illegal action '{}'", name)),
        },
        None => return OracleParse::SchemaError("missing action".to_string()),
    };

    let reasoning = match value.get("reasoning").and_then(Value::as_str) {
        Some(r) if !r.trim().is_empty() => r,
        _ => return OracleParse::SchemaError("missing or empty reasoning".to_string()),
    };

    let parameters = match value.get("parameters") {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return OracleParse::SchemaError("parameters is not an object".to_string()),
        None => return OracleParse::SchemaError("missing parameters".to_string()),
    };

    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_CONFIDENCE);

    match Decision::new(action, reasoning, confidence, parameters) {
        Ok(decision) => OracleParse::Parsed(decision),
        Err(e) => OracleParse::SchemaError(e),
    }
}

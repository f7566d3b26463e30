//! 步骤组合子：对每次外部调用施加超时、输出结构化审计日志，并按声明的策略处理失败
//!
//! - `run`：传播（Result 原样返回，错误按 StepKind 归类）
//! - `best_effort`：失败记 warn，视为缺失（None）
//! - `or_substitute`：失败时用调用方给出的替代值
//!
//! 每个调用点只需选定一种方法，传播还是替代在那里声明一次即可。

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;

/// 步骤类别：决定失败时归入哪类 AgentError
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Oracle,
    PlatformMutation,
    Enrichment,
    Persistence,
}

impl StepKind {
    fn error(self, message: String) -> AgentError {
        match self {
            StepKind::Oracle => AgentError::OracleUnavailable(message),
            StepKind::PlatformMutation => AgentError::PlatformMutation(message),
            StepKind::Enrichment => AgentError::Enrichment(message),
            StepKind::Persistence => AgentError::Persistence(message),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            StepKind::Oracle => "oracle",
            StepKind::PlatformMutation => "platform_mutation",
            StepKind::Enrichment => "enrichment",
            StepKind::Persistence => "persistence",
        }
    }
}

/// 一个带名称、类别与超时的外部调用步骤
#[derive(Debug, Clone, Copy)]
pub struct Step {
    name: &'static str,
    kind: StepKind,
    limit: Duration,
}

impl Step {
    pub fn new(name: &'static str, kind: StepKind, limit: Duration) -> Self {
        Self { name, kind, limit }
    }

    pub fn oracle(name: &'static str, limit: Duration) -> Self {
        Self::new(name, StepKind::Oracle, limit)
    }

    pub fn mutation(name: &'static str, limit: Duration) -> Self {
        Self::new(name, StepKind::PlatformMutation, limit)
    }

    pub fn enrichment(name: &'static str, limit: Duration) -> Self {
        Self::new(name, StepKind::Enrichment, limit)
    }

    pub fn persistence(name: &'static str, limit: Duration) -> Self {
        Self::new(name, StepKind::Persistence, limit)
    }

    /// 在超时内执行；超时与失败同样按 kind 归类为 AgentError
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = Instant::now();
        let result = timeout(self.limit, fut).await;

        let (ok, outcome) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "step_audit",
            "step": self.name,
            "kind": self.kind.as_str(),
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit.to_string(), "step");

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.kind.error(e.to_string())),
            Err(_) => Err(self.kind.error(format!(
                "{} timed out after {}ms",
                self.name,
                self.limit.as_millis()
            ))),
        }
    }

    /// 失败记 warn 并返回 None
    pub async fn best_effort<T, E, F>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self.run(fut).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(step = self.name, error = %e, "best-effort step failed, continuing without it");
                None
            }
        }
    }

    /// 失败时由 substitute 根据错误给出替代值
    pub async fn or_substitute<T, E, F, S>(&self, fut: F, substitute: S) -> T
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
        S: FnOnce(&AgentError) -> T,
    {
        match self.run(fut).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(step = self.name, error = %e, "step failed, substituting fallback");
                substitute(&e)
            }
        }
    }
}

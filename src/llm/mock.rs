//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! - MockLlmClient：恒定返回一个合法的 wait 决策，本地跑通整条流水线
//! - ScriptedLlmClient：按顺序回放预设回复（文本 / 错误 / 延迟），用于覆盖各类降级路径

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// Mock 客户端：总是回复等待
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        Ok(r#"{"action": "wait", "reasoning": "Mock LLM: no live model configured", "confidence": 0.5, "parameters": {"duration": 30}}"#.to_string())
    }
}

/// 预设回复
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Error(String),
    /// 先睡眠再返回文本，用于触发调用方超时
    Delayed(Duration, String),
}

/// 按队列顺序回放的客户端；队列耗尽后返回 fallback（默认报错）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// 每次都返回同一段文本
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// 每次都失败
    pub fn failing() -> Self {
        Self::default()
    }

    /// 已被调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用时最后一条消息的内容
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let (Ok(mut prompts), Some(last)) = (self.prompts.lock(), messages.last()) {
            prompts.push(last.content.clone());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Error(e)) => Err(e),
            Some(ScriptedReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => self
                .fallback
                .clone()
                .ok_or_else(|| "scripted llm: no reply configured".to_string()),
        }
    }
}

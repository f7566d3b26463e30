//! LLM 客户端抽象
//!
//! 决策、打分、内容生成、分析四类外部服务都经由 LlmClient::complete 调用；
//! 超时由调用方（core::step）统一施加，这里只负责一次请求/响应。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：非流式完成，返回原始文本（其中应包含一个 JSON 对象）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）及 JSON 提取

pub mod extract;
pub mod factory;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use extract::{extract_json_object, parse_json_object};
pub use factory::{create_llm_from_config, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT};
pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient, ScriptedReply};
pub use openai::{OpenAiClient, DEFAULT_TEMPERATURE};
pub use traits::LlmClient;

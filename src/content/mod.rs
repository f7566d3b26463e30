//! 内容生成：发帖正文与引用评论
//!
//! LlmContentGenerator 让模型输出 JSON（content / qualityScore / hashtags），
//! 模型只给出纯文本时整段作为正文；缺少 hashtags 时从正文里用正则提取。

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::llm::{parse_json_object, LlmClient, Message};
use crate::platform::Candidate;

/// 单条内容的长度上限（字符）
pub const MAX_CONTENT_CHARS: usize = 280;
/// 模型未给出质量分时的默认值
pub const DEFAULT_QUALITY_SCORE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    QuoteComment,
}

/// 生成请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub kind: ContentKind,
    pub topic: Option<String>,
    pub personality: String,
    /// 人设与学习上下文拼成的描述
    pub context: Option<String>,
    /// 参考账号的近期内容，用于模仿风格
    pub reference_posts: Vec<String>,
    /// 同话题的热门内容
    pub trending_posts: Vec<String>,
    /// 被引用的原帖（仅 QuoteComment）
    pub quoted: Option<Candidate>,
}

impl ContentRequest {
    pub fn post(personality: impl Into<String>, topic: Option<String>) -> Self {
        Self {
            kind: ContentKind::Post,
            topic,
            personality: personality.into(),
            context: None,
            reference_posts: Vec::new(),
            trending_posts: Vec::new(),
            quoted: None,
        }
    }

    pub fn quote(personality: impl Into<String>, quoted: Candidate, topic: Option<String>) -> Self {
        Self {
            kind: ContentKind::QuoteComment,
            quoted: Some(quoted),
            ..Self::post(personality, topic)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub content: String,
    pub quality_score: f64,
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, String>;
}

const POST_INSTRUCTION: &str = "You write a single original social media post. \
Stay under 280 characters, no quotes around the text. \
Reply with ONLY a JSON object: {\"content\": string, \"qualityScore\": number between 0 and 1, \"hashtags\": [string]}.";

const QUOTE_INSTRUCTION: &str = "You write a short commentary to accompany a quoted social media post. \
Add a point of view instead of repeating the original. Stay under 280 characters. \
Reply with ONLY a JSON object: {\"content\": string, \"qualityScore\": number between 0 and 1, \"hashtags\": [string]}.";

pub struct LlmContentGenerator {
    llm: Arc<dyn LlmClient>,
}

impl LlmContentGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn build_messages(request: &ContentRequest) -> Vec<Message> {
        let instruction = match request.kind {
            ContentKind::Post => POST_INSTRUCTION,
            ContentKind::QuoteComment => QUOTE_INSTRUCTION,
        };
        let mut body = json!({
            "personality": request.personality,
            "topic": request.topic,
        });
        if let Some(context) = &request.context {
            body["context"] = json!(context);
        }
        if !request.reference_posts.is_empty() {
            body["styleReferences"] = json!(request.reference_posts);
        }
        if !request.trending_posts.is_empty() {
            body["trending"] = json!(request.trending_posts);
        }
        if let Some(quoted) = &request.quoted {
            body["quoted"] = json!({ "id": quoted.id, "author": quoted.author_username, "text": quoted.text });
        }
        vec![
            Message::system(instruction),
            Message::user(serde_json::to_string_pretty(&body).unwrap_or_default()),
        ]
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, String> {
        let raw = self.llm.complete(&Self::build_messages(request)).await?;
        tracing::debug!(raw = %raw, "content generator raw output");
        parse_generated(&raw)
    }
}

/// 解析生成结果；正文为空视为失败
pub fn parse_generated(raw: &str) -> Result<GeneratedContent, String> {
    let (content, quality_score, hashtags) = match parse_json_object(raw) {
        Ok(value) => {
            let content = value
                .get("content")
                .or_else(|| value.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let quality = value
                .get("qualityScore")
                .or_else(|| value.get("quality_score"))
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_QUALITY_SCORE);
            let hashtags: Vec<String> = value
                .get("hashtags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(|t| t.trim_start_matches('#').to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            (content, quality, hashtags)
        }
        Err(_) => (raw.to_string(), DEFAULT_QUALITY_SCORE, Vec::new()),
    };

    let content = truncate_chars(content.trim().trim_matches('"').trim(), MAX_CONTENT_CHARS);
    if content.is_empty() {
        return Err("generated content is empty".to_string());
    }
    let hashtags = if hashtags.is_empty() {
        extract_hashtags(&content)
    } else {
        hashtags
    };
    let mut metadata = Map::new();
    metadata.insert("length".to_string(), json!(content.chars().count()));

    Ok(GeneratedContent {
        content,
        quality_score: quality_score.clamp(0.0, 1.0),
        hashtags,
        metadata,
    })
}

/// 正文中的 #话题（去掉 #，按出现顺序去重）
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r"#(\w+)") else {
        return Vec::new();
    };
    let mut tags: Vec<String> = Vec::new();
    for cap in re.captures_iter(text) {
        let tag = cap[1].to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

//! 平台 API 的请求与响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 互动数据快照；平台未返回时各项为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub impressions: u64,
}

impl EngagementMetrics {
    /// 互动总数（点赞 + 转发 + 回复），用于学习数据中的 engagement 值
    pub fn total(&self) -> u64 {
        self.likes + self.retweets + self.replies
    }
}

/// 可参与互动的平台内容（仅在一次动作的搜索/选择阶段存在）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_username: Option<String>,
    pub text: String,
    #[serde(default, alias = "metrics")]
    pub engagement_metrics: EngagementMetrics,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            author_username: None,
            text: text.into(),
            engagement_metrics: EngagementMetrics::default(),
            relevance_score: None,
        }
    }
}

/// 搜索参数
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub max_results: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

/// 变更类调用（发帖 / 转发 / 点赞 / 引用 / 关注）的统一返回
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// 新建内容的 id（发帖 / 引用时返回）
    #[serde(default)]
    pub id: Option<String>,
}

impl MutationResult {
    pub fn ok(id: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            id,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            id: None,
        }
    }
}

/// 自身账号信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub following_count: u64,
    /// 平台直接给出的今日发帖数；缺失时由周期存档统计
    #[serde(default)]
    pub posts_today: Option<u32>,
    #[serde(default)]
    pub last_post_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement_rate: f64,
    /// 剩余请求配额；Some(0) 视为已触发限流
    #[serde(default)]
    pub rate_limit_remaining: Option<u32>,
}

/// 批量拉取某用户最近推文的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTweets {
    pub username: String,
    #[serde(default)]
    pub tweets: Vec<Candidate>,
}

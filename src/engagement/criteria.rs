//! 各动作的选择标准
//!
//! 权重是按产品经验手调的常量，没有推导公式；调整时改这里的具名常量即可。

use serde::{Deserialize, Serialize};

use crate::decision::ActionKind;

/// 点赞：建立关系而非扩大曝光，几乎只看相关性
pub const LIKE_RELEVANCE_WEIGHT: f64 = 0.9;
pub const LIKE_ENGAGEMENT_WEIGHT: f64 = 0.1;
pub const LIKE_QUALITY_THRESHOLD: f64 = 5.0;

/// 转发：内容会出现在自己的时间线上，相关性与传播力并重
pub const RETWEET_RELEVANCE_WEIGHT: f64 = 0.5;
pub const RETWEET_ENGAGEMENT_WEIGHT: f64 = 0.5;
pub const RETWEET_QUALITY_THRESHOLD: f64 = 7.0;

/// 引用：需要有话可说，略偏相关性
pub const QUOTE_RELEVANCE_WEIGHT: f64 = 0.6;
pub const QUOTE_ENGAGEMENT_WEIGHT: f64 = 0.4;
pub const QUOTE_QUALITY_THRESHOLD: f64 = 7.0;

/// 关注：看作者的专业度与影响力
pub const FOLLOW_RELEVANCE_WEIGHT: f64 = 0.3;
pub const FOLLOW_ENGAGEMENT_WEIGHT: f64 = 0.7;
pub const FOLLOW_QUALITY_THRESHOLD: f64 = 6.0;
pub const FOLLOW_TOPIC_SUFFIX: &str = "expertise and authority";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCriteria {
    pub topic: String,
    /// 0-10 分制下的最低期望分，写入打分 prompt
    pub quality_threshold: f64,
    pub engagement_weight: f64,
    pub relevance_weight: f64,
}

impl SelectionCriteria {
    /// 按动作取标准；post / wait 不做候选选择，返回均衡权重
    pub fn for_action(action: ActionKind, topic: &str) -> Self {
        let (relevance_weight, engagement_weight, quality_threshold, topic) = match action {
            ActionKind::Like => (
                LIKE_RELEVANCE_WEIGHT,
                LIKE_ENGAGEMENT_WEIGHT,
                LIKE_QUALITY_THRESHOLD,
                topic.to_string(),
            ),
            ActionKind::Retweet => (
                RETWEET_RELEVANCE_WEIGHT,
                RETWEET_ENGAGEMENT_WEIGHT,
                RETWEET_QUALITY_THRESHOLD,
                topic.to_string(),
            ),
            ActionKind::QuoteTweet => (
                QUOTE_RELEVANCE_WEIGHT,
                QUOTE_ENGAGEMENT_WEIGHT,
                QUOTE_QUALITY_THRESHOLD,
                topic.to_string(),
            ),
            ActionKind::Follow => (
                FOLLOW_RELEVANCE_WEIGHT,
                FOLLOW_ENGAGEMENT_WEIGHT,
                FOLLOW_QUALITY_THRESHOLD,
                format!("{topic} ({FOLLOW_TOPIC_SUFFIX})"),
            ),
            ActionKind::Post | ActionKind::Wait => (0.5, 0.5, 5.0, topic.to_string()),
        };
        Self {
            topic,
            quality_threshold,
            engagement_weight,
            relevance_weight,
        }
    }
}

//! 学习上下文混合：并行读取两份独立数据源，各自失败各自降级为空，再合成一个上下文片段
//!
//! 该片段同时供决策服务与内容生成使用；本身从不持久化，每个 tick 重新计算。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::learning::{EngagementPattern, LearningSource, SuccessfulTopic};
use crate::core::Step;

/// recentTopics 最多保留的话题数
pub const MAX_RECENT_TOPICS: usize = 5;
/// 无互动数据时的默认时段
pub const DEFAULT_TIME_SLOT: &str = "09:00-10:00";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningContext {
    pub recent_topics: Vec<String>,
    pub optimal_time_slot: String,
    pub avg_engagement: f64,
}

impl Default for LearningContext {
    fn default() -> Self {
        Self {
            recent_topics: Vec::new(),
            optimal_time_slot: DEFAULT_TIME_SLOT.to_string(),
            avg_engagement: 0.0,
        }
    }
}

impl LearningContext {
    /// 拼入内容生成 prompt 的文本片段
    pub fn to_prompt_fragment(&self) -> String {
        let topics = if self.recent_topics.is_empty() {
            "none yet".to_string()
        } else {
            self.recent_topics.join(", ")
        };
        format!(
            "Recently successful topics: {}\nBest posting window (UTC): {}\nAverage engagement per action: {:.1}",
            topics, self.optimal_time_slot, self.avg_engagement
        )
    }
}

/// 纯函数：由两份历史数据合成上下文
pub fn blend(patterns: &[EngagementPattern], topics: &[SuccessfulTopic]) -> LearningContext {
    let mut sorted: Vec<&SuccessfulTopic> = topics.iter().collect();
    sorted.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    let mut seen = HashSet::new();
    let recent_topics = sorted
        .into_iter()
        .map(|t| t.topic.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .take(MAX_RECENT_TOPICS)
        .map(String::from)
        .collect();

    let mut by_hour: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for p in patterns.iter().filter(|p| p.hour < 24) {
        let entry = by_hour.entry(p.hour).or_insert((0.0, 0));
        entry.0 += p.engagement;
        entry.1 += 1;
    }
    // BTreeMap 按小时升序遍历，严格大于才替换，平局取最早的小时
    let mut best: Option<(u32, f64)> = None;
    for (hour, (sum, count)) in &by_hour {
        let mean = sum / *count as f64;
        if best.map_or(true, |(_, m)| mean > m) {
            best = Some((*hour, mean));
        }
    }
    let optimal_time_slot = best
        .map(|(hour, _)| format!("{:02}:00-{:02}:00", hour, (hour + 1) % 24))
        .unwrap_or_else(|| DEFAULT_TIME_SLOT.to_string());

    let avg_engagement = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.engagement).sum::<f64>() / patterns.len() as f64
    };

    LearningContext {
        recent_topics,
        optimal_time_slot,
        avg_engagement,
    }
}

pub struct LearningBlender {
    source: Arc<dyn LearningSource>,
    timeout: Duration,
}

impl LearningBlender {
    pub fn new(source: Arc<dyn LearningSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn source(&self) -> &Arc<dyn LearningSource> {
        &self.source
    }

    /// 两份数据并行加载；任一失败只影响它自己（记 warn 后按空处理）
    pub async fn blend(&self) -> LearningContext {
        let patterns_step = Step::persistence("engagement_patterns", self.timeout);
        let topics_step = Step::persistence("successful_topics", self.timeout);
        let (patterns, topics) = tokio::join!(
            patterns_step.best_effort(self.source.load_engagement_patterns()),
            topics_step.best_effort(self.source.load_successful_topics()),
        );
        blend(
            &patterns.unwrap_or_default(),
            &topics.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLearningStore;
    use chrono::{Duration as ChronoDuration, Utc};

    fn pattern(hour: u32, engagement: f64) -> EngagementPattern {
        EngagementPattern {
            hour,
            engagement,
            action: "post".into(),
            recorded_at: Utc::now(),
        }
    }

    fn topic(name: &str, minutes_ago: i64) -> SuccessfulTopic {
        SuccessfulTopic {
            topic: name.into(),
            engagement: 1.0,
            recorded_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_empty_history_defaults() {
        assert_eq!(blend(&[], &[]), LearningContext::default());
    }

    #[test]
    fn test_optimal_slot_is_highest_mean_hour() {
        let patterns = [pattern(9, 2.0), pattern(14, 10.0), pattern(14, 6.0), pattern(20, 7.0)];
        let ctx = blend(&patterns, &[]);
        assert_eq!(ctx.optimal_time_slot, "14:00-15:00");
        assert_eq!(ctx.avg_engagement, 6.25);
    }

    #[test]
    fn test_slot_wraps_midnight_and_ties_pick_earliest() {
        let ctx = blend(&[pattern(23, 5.0)], &[]);
        assert_eq!(ctx.optimal_time_slot, "23:00-00:00");
        let ctx = blend(&[pattern(18, 4.0), pattern(7, 4.0)], &[]);
        assert_eq!(ctx.optimal_time_slot, "07:00-08:00");
    }

    #[test]
    fn test_recent_topics_newest_first_deduped_capped() {
        let topics = [
            topic("old", 60),
            topic("Rust", 1),
            topic("rust", 2),
            topic("a", 3),
            topic("b", 4),
            topic("c", 5),
            topic("d", 6),
        ];
        let ctx = blend(&[], &topics);
        assert_eq!(ctx.recent_topics, vec!["Rust", "a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_each_source_falls_back_independently() {
        let store = InMemoryLearningStore::new(vec![pattern(10, 4.0)], vec![topic("llm", 1)])
            .with_failing_topics();
        let blender = LearningBlender::new(Arc::new(store), Duration::from_secs(1));
        let ctx = blender.blend().await;
        assert!(ctx.recent_topics.is_empty());
        assert_eq!(ctx.optimal_time_slot, "10:00-11:00");

        let store = InMemoryLearningStore::new(vec![pattern(10, 4.0)], vec![topic("llm", 1)])
            .with_failing_patterns();
        let blender = LearningBlender::new(Arc::new(store), Duration::from_secs(1));
        let ctx = blender.blend().await;
        assert_eq!(ctx.recent_topics, vec!["llm"]);
        assert_eq!(ctx.avg_engagement, 0.0);
    }

    #[test]
    fn test_prompt_fragment() {
        let ctx = LearningContext {
            recent_topics: vec!["rust".into(), "wasm".into()],
            optimal_time_slot: "14:00-15:00".into(),
            avg_engagement: 3.0,
        };
        let text = ctx.to_prompt_fragment();
        assert!(text.contains("rust, wasm"));
        assert!(text.contains("14:00-15:00"));
    }
}

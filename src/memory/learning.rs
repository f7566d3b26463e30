//! 学习数据源：互动模式（按小时的互动量）与成功话题，两份数据独立存取、独立降级
//!
//! FileLearningStore 将两者分别写入 data_dir 下的 engagement_patterns.json 与 successful_topics.json；
//! 文件不存在视为空。InMemoryLearningStore 供测试使用，可单独让某一份数据失败。

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::actions::{ActionOutcome, OutcomeKind};

/// 每份数据最多保留的条目数（超出时丢弃最旧的）
pub const MAX_LEARNING_RECORDS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementPattern {
    /// UTC 小时（0-23）
    pub hour: u32,
    pub engagement: f64,
    pub action: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessfulTopic {
    pub topic: String,
    pub engagement: f64,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait LearningSource: Send + Sync {
    async fn load_engagement_patterns(&self) -> Result<Vec<EngagementPattern>, String>;

    async fn load_successful_topics(&self) -> Result<Vec<SuccessfulTopic>, String>;

    /// 将一次成功动作写回两份数据（wait / 失败的结果不记录）
    async fn record_outcome(&self, outcome: &ActionOutcome) -> Result<(), String>;
}

/// 从结果中提取要写回的条目；不值得记录时返回 (None, None)
///
/// 互动模式只记录本账号发布的内容；转发 / 点赞 / 关注的目标互动量属于别人，
/// 它们只留下话题，engagement 记为 0。
fn records_for(outcome: &ActionOutcome) -> (Option<EngagementPattern>, Option<SuccessfulTopic>) {
    if !outcome.success || matches!(outcome.action, OutcomeKind::Wait | OutcomeKind::Analyze) {
        return (None, None);
    }
    let own = outcome.action.publishes_own_content();
    let engagement = if own {
        outcome.engagement.total() as f64
    } else {
        0.0
    };
    let pattern = own.then(|| EngagementPattern {
        hour: outcome.timestamp.hour(),
        engagement,
        action: outcome.action.as_str().to_string(),
        recorded_at: outcome.timestamp,
    });
    let topic = outcome
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| SuccessfulTopic {
            topic: t.to_string(),
            engagement,
            recorded_at: outcome.timestamp,
        });
    (pattern, topic)
}

fn push_capped<T>(items: &mut Vec<T>, item: T) {
    items.push(item);
    if items.len() > MAX_LEARNING_RECORDS {
        let excess = items.len() - MAX_LEARNING_RECORDS;
        items.drain(..excess);
    }
}

/// 基于 JSON 文件的学习数据
#[derive(Debug, Clone)]
pub struct FileLearningStore {
    dir: PathBuf,
}

impl FileLearningStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.dir.join("engagement_patterns.json")
    }

    pub fn topics_path(&self) -> PathBuf {
        self.dir.join("successful_topics.json")
    }

    async fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, String> {
        match fs::read_to_string(path).await {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| format!("{}: {}", path.display(), e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(format!("{}: {}", path.display(), e)),
        }
    }

    async fn save<T: Serialize>(path: &Path, items: &[T]) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        let data = serde_json::to_string_pretty(items).map_err(|e| e.to_string())?;
        fs::write(path, data)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))
    }
}

#[async_trait]
impl LearningSource for FileLearningStore {
    async fn load_engagement_patterns(&self) -> Result<Vec<EngagementPattern>, String> {
        Self::load(&self.patterns_path()).await
    }

    async fn load_successful_topics(&self) -> Result<Vec<SuccessfulTopic>, String> {
        Self::load(&self.topics_path()).await
    }

    async fn record_outcome(&self, outcome: &ActionOutcome) -> Result<(), String> {
        let (pattern, topic) = records_for(outcome);
        if let Some(pattern) = pattern {
            let mut patterns = self.load_engagement_patterns().await?;
            push_capped(&mut patterns, pattern);
            Self::save(&self.patterns_path(), &patterns).await?;
        }
        if let Some(topic) = topic {
            let mut topics = self.load_successful_topics().await?;
            push_capped(&mut topics, topic);
            Self::save(&self.topics_path(), &topics).await?;
        }
        Ok(())
    }
}

/// 内存学习数据（测试用）；可分别让两份数据加载失败
#[derive(Debug, Default)]
pub struct InMemoryLearningStore {
    patterns: Mutex<Vec<EngagementPattern>>,
    topics: Mutex<Vec<SuccessfulTopic>>,
    fail_patterns: bool,
    fail_topics: bool,
    load_delay: Option<Duration>,
}

impl InMemoryLearningStore {
    pub fn new(patterns: Vec<EngagementPattern>, topics: Vec<SuccessfulTopic>) -> Self {
        Self {
            patterns: Mutex::new(patterns),
            topics: Mutex::new(topics),
            ..Self::default()
        }
    }

    pub fn with_failing_patterns(mut self) -> Self {
        self.fail_patterns = true;
        self
    }

    pub fn with_failing_topics(mut self) -> Self {
        self.fail_topics = true;
        self
    }

    /// 每次加载前等待，模拟慢存储
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn patterns(&self) -> Vec<EngagementPattern> {
        self.patterns.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<SuccessfulTopic> {
        self.topics.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LearningSource for InMemoryLearningStore {
    async fn load_engagement_patterns(&self) -> Result<Vec<EngagementPattern>, String> {
        self.simulate_latency().await;
        if self.fail_patterns {
            return Err("engagement patterns unavailable".to_string());
        }
        Ok(self.patterns())
    }

    async fn load_successful_topics(&self) -> Result<Vec<SuccessfulTopic>, String> {
        self.simulate_latency().await;
        if self.fail_topics {
            return Err("successful topics unavailable".to_string());
        }
        Ok(self.topics())
    }

    async fn record_outcome(&self, outcome: &ActionOutcome) -> Result<(), String> {
        let (pattern, topic) = records_for(outcome);
        if let (Some(pattern), Ok(mut patterns)) = (pattern, self.patterns.lock()) {
            push_capped(&mut patterns, pattern);
        }
        if let (Some(topic), Ok(mut topics)) = (topic, self.topics.lock()) {
            push_capped(&mut topics, topic);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::EngagementMetrics;

    fn post_outcome() -> ActionOutcome {
        let mut outcome = ActionOutcome::new(OutcomeKind::Post);
        outcome.topic = Some("rust async".into());
        outcome.engagement = EngagementMetrics {
            likes: 3,
            retweets: 1,
            replies: 1,
            impressions: 100,
        };
        outcome
    }

    #[tokio::test]
    async fn test_file_store_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLearningStore::new(dir.path());
        assert!(store.load_engagement_patterns().await.unwrap().is_empty());
        assert!(store.load_successful_topics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_records_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLearningStore::new(dir.path().join("learning"));
        store.record_outcome(&post_outcome()).await.unwrap();

        let patterns = store.load_engagement_patterns().await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].engagement, 5.0);
        assert_eq!(patterns[0].action, "post");
        let topics = store.load_successful_topics().await.unwrap();
        assert_eq!(topics[0].topic, "rust async");
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_only_that_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLearningStore::new(dir.path());
        std::fs::write(store.patterns_path(), "not json").unwrap();
        assert!(store.load_engagement_patterns().await.is_err());
        assert!(store.load_successful_topics().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_and_failures_are_not_recorded() {
        let store = InMemoryLearningStore::default();
        store
            .record_outcome(&ActionOutcome::wait("nothing to do"))
            .await
            .unwrap();
        let mut failed = post_outcome();
        failed.success = false;
        store.record_outcome(&failed).await.unwrap();
        assert!(store.patterns().is_empty());
        assert!(store.topics().is_empty());
    }

    #[tokio::test]
    async fn test_interactions_do_not_claim_target_engagement() {
        let store = InMemoryLearningStore::default();
        let mut retweet = ActionOutcome::new(OutcomeKind::Retweet);
        retweet.topic = Some("rust".into());
        retweet.target_engagement = Some(EngagementMetrics {
            likes: 50_000,
            retweets: 9_000,
            replies: 1_000,
            impressions: 0,
        });
        store.record_outcome(&retweet).await.unwrap();
        assert!(store.patterns().is_empty());
        let topics = store.topics();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].engagement, 0.0);

        store.record_outcome(&post_outcome()).await.unwrap();
        let patterns = store.patterns();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].action, "post");
    }

    #[test]
    fn test_push_capped_drops_oldest() {
        let mut items: Vec<usize> = (0..MAX_LEARNING_RECORDS).collect();
        push_capped(&mut items, MAX_LEARNING_RECORDS);
        assert_eq!(items.len(), MAX_LEARNING_RECORDS);
        assert_eq!(items[0], 1);
    }
}

//! 社交平台抽象
//!
//! 搜索、变更（发帖 / 转发 / 点赞 / 引用 / 关注）与账号查询。变更调用返回 MutationResult，
//! success=false 时由动作执行器转为 AgentError::PlatformMutation 向上抛出；传输层错误同样以 Err(String) 返回。

use async_trait::async_trait;

use super::{AccountInfo, Candidate, EngagementMetrics, MutationResult, SearchParams, UserTweets};

#[async_trait]
pub trait SocialPlatform: Send + Sync {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<Candidate>, String>;

    async fn post(&self, text: &str) -> Result<MutationResult, String>;

    async fn retweet(&self, tweet_id: &str) -> Result<MutationResult, String>;

    async fn like(&self, tweet_id: &str) -> Result<MutationResult, String>;

    async fn quote_tweet(&self, tweet_id: &str, text: &str) -> Result<MutationResult, String>;

    async fn follow(&self, user_id: &str) -> Result<MutationResult, String>;

    async fn get_account_info(&self) -> Result<AccountInfo, String>;

    async fn get_batch_user_last_tweets(
        &self,
        usernames: &[String],
        limit: usize,
    ) -> Result<Vec<UserTweets>, String>;

    /// 刚发布内容的互动快照
    async fn get_tweet_metrics(&self, tweet_id: &str) -> Result<EngagementMetrics, String>;
}

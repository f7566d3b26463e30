//! 内存平台（用于测试与 dry-run）：按查询返回预设候选，记录每一次调用

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AccountInfo, Candidate, EngagementMetrics, MutationResult, SearchParams, SocialPlatform,
    UserTweets,
};

#[derive(Debug)]
pub struct MockPlatform {
    results_by_query: HashMap<String, Vec<Candidate>>,
    default_results: Vec<Candidate>,
    failing_queries: HashSet<String>,
    mutation_result: MutationResult,
    account: Result<AccountInfo, String>,
    user_tweets: Result<Vec<UserTweets>, String>,
    metrics: Result<EngagementMetrics, String>,
    /// 变更调用在返回前等待的时长
    mutation_delay: Option<Duration>,
    account_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    /// 已经返回的变更调用数（被取消的调用不计）
    completed: AtomicUsize,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            results_by_query: HashMap::new(),
            default_results: Vec::new(),
            failing_queries: HashSet::new(),
            mutation_result: MutationResult::ok(Some("mock-1".to_string())),
            account: Ok(AccountInfo {
                id: "self".to_string(),
                username: "sparrow".to_string(),
                ..AccountInfo::default()
            }),
            user_tweets: Ok(Vec::new()),
            metrics: Err("metrics unavailable".to_string()),
            mutation_delay: None,
            account_delay: None,
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// 任意未单独配置的查询都返回这些候选
    pub fn with_default_results(mut self, candidates: Vec<Candidate>) -> Self {
        self.default_results = candidates;
        self
    }

    pub fn with_results(mut self, query: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        self.results_by_query.insert(query.into(), candidates);
        self
    }

    pub fn with_failing_query(mut self, query: impl Into<String>) -> Self {
        self.failing_queries.insert(query.into());
        self
    }

    /// 所有变更调用返回的结果
    pub fn with_mutation_result(mut self, result: MutationResult) -> Self {
        self.mutation_result = result;
        self
    }

    pub fn with_account(mut self, account: Result<AccountInfo, String>) -> Self {
        self.account = account;
        self
    }

    pub fn with_user_tweets(mut self, tweets: Result<Vec<UserTweets>, String>) -> Self {
        self.user_tweets = tweets;
        self
    }

    pub fn with_metrics(mut self, metrics: Result<EngagementMetrics, String>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_mutation_delay(mut self, delay: Duration) -> Self {
        self.mutation_delay = Some(delay);
        self
    }

    pub fn with_account_delay(mut self, delay: Duration) -> Self {
        self.account_delay = Some(delay);
        self
    }

    /// 形如 "search:rust"、"post:hello"、"follow:u1" 的调用记录
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn completed_mutations(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 以 prefix 开头的调用次数
    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// 记录调用，等待配置的延迟后返回预设结果
    async fn mutate(&self, call: String) -> Result<MutationResult, String> {
        self.record(call);
        if let Some(delay) = self.mutation_delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(self.mutation_result.clone())
    }
}

#[async_trait]
impl SocialPlatform for MockPlatform {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<Candidate>, String> {
        self.record(format!("search:{query}"));
        if self.failing_queries.contains(query) {
            return Err(format!("search failed for '{query}'"));
        }
        let results = self
            .results_by_query
            .get(query)
            .unwrap_or(&self.default_results);
        Ok(results.iter().take(params.max_results).cloned().collect())
    }

    async fn post(&self, text: &str) -> Result<MutationResult, String> {
        self.mutate(format!("post:{text}")).await
    }

    async fn retweet(&self, tweet_id: &str) -> Result<MutationResult, String> {
        self.mutate(format!("retweet:{tweet_id}")).await
    }

    async fn like(&self, tweet_id: &str) -> Result<MutationResult, String> {
        self.mutate(format!("like:{tweet_id}")).await
    }

    async fn quote_tweet(&self, tweet_id: &str, text: &str) -> Result<MutationResult, String> {
        self.mutate(format!("quote:{tweet_id}:{text}")).await
    }

    async fn follow(&self, user_id: &str) -> Result<MutationResult, String> {
        self.mutate(format!("follow:{user_id}")).await
    }

    async fn get_account_info(&self) -> Result<AccountInfo, String> {
        self.record("account".to_string());
        if let Some(delay) = self.account_delay {
            tokio::time::sleep(delay).await;
        }
        self.account.clone()
    }

    async fn get_batch_user_last_tweets(
        &self,
        usernames: &[String],
        _limit: usize,
    ) -> Result<Vec<UserTweets>, String> {
        self.record(format!("last_tweets:{}", usernames.join(",")));
        self.user_tweets.clone()
    }

    async fn get_tweet_metrics(&self, tweet_id: &str) -> Result<EngagementMetrics, String> {
        self.record(format!("metrics:{tweet_id}"));
        self.metrics.clone()
    }
}

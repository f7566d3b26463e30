//! 动作执行器：搜索 → 选择（按需）→ 平台变更 → 统一结果信封
//!
//! 失败语义：
//! - 平台变更失败（传输错误或 `success: false`）以 AgentError::PlatformMutation 抛出，不重试
//! - best-effort 子步骤（参考时间线、话题搜索、互动快照、分析落盘）失败只记 warn，当作缺失
//! - 缺少 query、没有候选、内容生成失败都返回 success 的 wait 信封

pub mod analyze;
pub mod follow;
pub mod like;
pub mod post;
pub mod quote;
pub mod retweet;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{AppConfig, Timeouts};
use crate::content::ContentGenerator;
use crate::core::deadline::check_opt;
use crate::core::{AgentError, Deadline, Step};
use crate::cycle::CycleStore;
use crate::decision::{ActionKind, Decision};
use crate::engagement::{
    CandidateSearch, CandidateSelector, SearchOptions, Selection, SelectionCriteria,
};
use crate::llm::LlmClient;
use crate::memory::{LearningBlender, LearningContext};
use crate::platform::{Candidate, EngagementMetrics, MutationResult, SocialPlatform};

/// 结果信封中的动作名；比 ActionKind 多一个 analyze（不由决策服务选择）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Post,
    Retweet,
    QuoteTweet,
    Like,
    Follow,
    Wait,
    Analyze,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Post => "post",
            OutcomeKind::Retweet => "retweet",
            OutcomeKind::QuoteTweet => "quote_tweet",
            OutcomeKind::Like => "like",
            OutcomeKind::Follow => "follow",
            OutcomeKind::Wait => "wait",
            OutcomeKind::Analyze => "analyze",
        }
    }

    /// 是否发布了自己的内容；只有这类结果的互动量属于本账号
    pub fn publishes_own_content(self) -> bool {
        matches!(self, OutcomeKind::Post | OutcomeKind::QuoteTweet)
    }
}

impl From<ActionKind> for OutcomeKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Post => OutcomeKind::Post,
            ActionKind::Retweet => OutcomeKind::Retweet,
            ActionKind::QuoteTweet => OutcomeKind::QuoteTweet,
            ActionKind::Like => OutcomeKind::Like,
            ActionKind::Follow => OutcomeKind::Follow,
            ActionKind::Wait => OutcomeKind::Wait,
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 统一结果信封；每个周期持久化一份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    pub action: OutcomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_tweet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    /// 新建内容的 id（post / quote_tweet）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// 本账号新内容的互动快照；转发 / 点赞 / 关注保持全 0
    #[serde(default)]
    pub engagement: EngagementMetrics,
    /// 被操作目标在选择时的互动量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_engagement: Option<EngagementMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn new(action: OutcomeKind) -> Self {
        Self {
            success: true,
            action,
            reason: None,
            content: None,
            target_tweet_id: None,
            target_user_id: None,
            posted_id: None,
            topic: None,
            engagement: EngagementMetrics::default(),
            target_engagement: None,
            selection: None,
            analysis: None,
            timestamp: Utc::now(),
        }
    }

    /// 「本次不做事」：成功的 wait，附带原因
    pub fn wait(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(OutcomeKind::Wait)
        }
    }

    /// 动作成功执行但未产生平台变更之外的结果（如分析服务不可用）
    pub fn failed(action: OutcomeKind, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            ..Self::new(action)
        }
    }

    pub fn is_wait(&self) -> bool {
        self.action == OutcomeKind::Wait
    }
}

/// 执行器运行期设置
#[derive(Debug, Clone)]
pub struct ActionSettings {
    pub personality: String,
    pub reference_accounts: Vec<String>,
    pub reference_limit: usize,
    pub max_search_results: usize,
    /// 分析结果落盘目录；None 时不落盘
    pub analysis_dir: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ActionSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            personality: cfg.agent.personality.clone(),
            reference_accounts: cfg.agent.reference_accounts.clone(),
            reference_limit: cfg.agent.reference_limit,
            max_search_results: cfg.platform.max_search_results,
            analysis_dir: Some(cfg.app.data_dir().join("analysis")),
            timeouts: cfg.timeouts(),
        }
    }
}

/// 分派动作时携带的本 tick 上下文
#[derive(Debug, Clone, Default)]
pub struct TickContext {
    /// 流水线已为本 tick 混合好的学习上下文；None 时执行器自行加载
    pub learning: Option<LearningContext>,
    /// tick 预算截止时间；None 表示不受限
    pub deadline: Option<Deadline>,
}

impl TickContext {
    pub fn new(learning: Option<LearningContext>, deadline: Option<Deadline>) -> Self {
        Self { learning, deadline }
    }

    /// 开始新的外部步骤前检查预算
    pub(crate) fn check(&self, next_step: &str) -> Result<(), AgentError> {
        check_opt(self.deadline.as_ref(), next_step)
    }
}

/// 执行器依赖的全部协作者
pub struct ActionExecutors {
    pub(crate) platform: Arc<dyn SocialPlatform>,
    pub(crate) search: CandidateSearch,
    pub(crate) selector: CandidateSelector,
    pub(crate) content: Arc<dyn ContentGenerator>,
    pub(crate) learning: Arc<LearningBlender>,
    pub(crate) cycles: Arc<dyn CycleStore>,
    pub(crate) analyst: Arc<dyn LlmClient>,
    pub(crate) settings: ActionSettings,
}

/// 搜索 + 选择的结果：要么找到目标，要么给出 wait 信封
pub(crate) enum Target {
    Found {
        candidate: Candidate,
        selection: Selection,
        query: String,
    },
    Skip(ActionOutcome),
}

pub struct ActionExecutorsBuilder {
    platform: Arc<dyn SocialPlatform>,
    llm: Arc<dyn LlmClient>,
    content: Arc<dyn ContentGenerator>,
    learning: Arc<LearningBlender>,
    cycles: Arc<dyn CycleStore>,
    self_id: String,
    settings: ActionSettings,
}

impl ActionExecutorsBuilder {
    pub fn self_id(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = self_id.into();
        self
    }

    pub fn settings(mut self, settings: ActionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> ActionExecutors {
        let timeouts = self.settings.timeouts;
        ActionExecutors {
            search: CandidateSearch::new(self.platform.clone(), self.self_id, timeouts.platform),
            selector: CandidateSelector::new(self.llm.clone(), timeouts.scoring),
            platform: self.platform,
            content: self.content,
            learning: self.learning,
            cycles: self.cycles,
            analyst: self.llm,
            settings: self.settings,
        }
    }
}

impl ActionExecutors {
    /// llm 同时用于候选打分与分析
    pub fn builder(
        platform: Arc<dyn SocialPlatform>,
        llm: Arc<dyn LlmClient>,
        content: Arc<dyn ContentGenerator>,
        learning: Arc<LearningBlender>,
        cycles: Arc<dyn CycleStore>,
    ) -> ActionExecutorsBuilder {
        ActionExecutorsBuilder {
            platform,
            llm,
            content,
            learning,
            cycles,
            self_id: String::new(),
            settings: ActionSettings::default(),
        }
    }

    /// 不受预算约束的单次分派
    pub async fn dispatch(&self, decision: &Decision) -> Result<ActionOutcome, AgentError> {
        self.dispatch_in(decision, &TickContext::default()).await
    }

    /// 按决策动作分派；ActionKind 是封闭枚举，新增动作必须在这里处理
    pub async fn dispatch_in(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        tracing::info!(action = %decision.action(), confidence = decision.confidence(), "dispatching action");
        match decision.action() {
            ActionKind::Post => self.post(decision, ctx).await,
            ActionKind::Retweet => self.retweet(decision, ctx).await,
            ActionKind::QuoteTweet => self.quote_tweet(decision, ctx).await,
            ActionKind::Like => self.like(decision, ctx).await,
            ActionKind::Follow => self.follow(decision, ctx).await,
            ActionKind::Wait => {
                let reason = decision
                    .param_str("reason")
                    .unwrap_or_else(|| decision.reasoning());
                Ok(ActionOutcome::wait(reason))
            }
        }
    }

    /// 需要 query 的动作：取 query → 搜索 → 选择
    pub(crate) async fn find_target(
        &self,
        decision: &Decision,
        kind: OutcomeKind,
        options: SearchOptions,
    ) -> Target {
        let Some(query) = decision.query() else {
            tracing::info!(action = %kind, "decision carries no query, waiting");
            return Target::Skip(ActionOutcome::wait(format!("No query for {kind} action")));
        };

        let candidates = self.search.search(query, &options).await;
        let criteria = SelectionCriteria::for_action(decision.action(), query);
        let Some(selection) = self.selector.select(&candidates, &criteria).await else {
            let diagnostic = AgentError::NoCandidates(format!("query '{query}'"));
            tracing::info!(action = %kind, diagnostic = %diagnostic, "no candidates after filtering, waiting");
            let mut outcome = ActionOutcome::wait(format!("No candidates found for query '{query}'"));
            outcome.topic = Some(query.to_string());
            return Target::Skip(outcome);
        };

        let candidate = candidates
            .iter()
            .find(|c| c.id == selection.tweet_id)
            .or_else(|| candidates.first())
            .cloned();
        match candidate {
            Some(candidate) => Target::Found {
                candidate,
                selection,
                query: query.to_string(),
            },
            None => Target::Skip(ActionOutcome::wait(format!("No candidates found for query '{query}'"))),
        }
    }

    /// 优先复用本 tick 已混合的学习上下文
    pub(crate) async fn learning_context(&self, ctx: &TickContext) -> LearningContext {
        match &ctx.learning {
            Some(learning) => learning.clone(),
            None => self.learning.blend().await,
        }
    }

    /// 新发布内容的互动快照；取不到时全 0
    pub(crate) async fn engagement_snapshot(&self, posted_id: Option<&str>) -> EngagementMetrics {
        match posted_id {
            Some(id) => Step::enrichment("engagement_snapshot", self.settings.timeouts.platform)
                .best_effort(self.platform.get_tweet_metrics(id))
                .await
                .unwrap_or_default(),
            None => EngagementMetrics::default(),
        }
    }

    pub(crate) fn single_search(&self) -> SearchOptions {
        SearchOptions::single(self.settings.max_search_results)
    }

    /// 预算已耗尽时不再发出变更；一旦发出，只受自身超时约束
    pub(crate) fn mutation_step(
        &self,
        name: &'static str,
        ctx: &TickContext,
    ) -> Result<Step, AgentError> {
        ctx.check(name)?;
        Ok(Step::mutation(name, self.settings.timeouts.platform))
    }
}

/// 平台返回 `success: false` 时转为 PlatformMutation，错误信息原样携带
pub(crate) fn ensure_success(result: MutationResult) -> Result<MutationResult, AgentError> {
    if result.success {
        Ok(result)
    } else {
        Err(AgentError::PlatformMutation(
            result
                .error
                .unwrap_or_else(|| "platform rejected the request".to_string()),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::cycle::InMemoryCycleStore;
    use crate::llm::ScriptedLlmClient;
    use crate::memory::InMemoryLearningStore;
    use crate::platform::MockPlatform;
    use std::time::Duration;

    /// 测试用执行器：所有协作者都是内存实现，超时缩短
    pub struct Harness {
        pub platform: Arc<MockPlatform>,
        pub llm: Arc<ScriptedLlmClient>,
        pub writer: Arc<ScriptedLlmClient>,
        pub cycles: Arc<InMemoryCycleStore>,
        pub executors: ActionExecutors,
    }

    pub fn harness(platform: MockPlatform, llm: ScriptedLlmClient, writer: ScriptedLlmClient) -> Harness {
        harness_with_dir(platform, llm, writer, None)
    }

    pub fn harness_with_dir(
        platform: MockPlatform,
        llm: ScriptedLlmClient,
        writer: ScriptedLlmClient,
        analysis_dir: Option<PathBuf>,
    ) -> Harness {
        build(platform, llm, writer, analysis_dir, InMemoryLearningStore::default())
    }

    pub fn harness_with_learning(
        platform: MockPlatform,
        writer: ScriptedLlmClient,
        store: InMemoryLearningStore,
    ) -> Harness {
        build(platform, ScriptedLlmClient::failing(), writer, None, store)
    }

    fn build(
        platform: MockPlatform,
        llm: ScriptedLlmClient,
        writer: ScriptedLlmClient,
        analysis_dir: Option<PathBuf>,
        store: InMemoryLearningStore,
    ) -> Harness {
        let platform = Arc::new(platform);
        let llm = Arc::new(llm);
        let writer = Arc::new(writer);
        let cycles = Arc::new(InMemoryCycleStore::new());
        let learning = Arc::new(LearningBlender::new(Arc::new(store), Duration::from_millis(200)));
        let timeouts = Timeouts {
            decision: Duration::from_millis(200),
            scoring: Duration::from_millis(200),
            generation: Duration::from_millis(200),
            analysis: Duration::from_millis(200),
            platform: Duration::from_millis(200),
        };
        let settings = ActionSettings {
            analysis_dir,
            timeouts,
            ..ActionSettings::default()
        };
        let executors = ActionExecutors::builder(
            platform.clone(),
            llm.clone(),
            Arc::new(crate::content::LlmContentGenerator::new(writer.clone())),
            learning,
            cycles.clone(),
        )
        .self_id("self")
        .settings(settings)
        .build();
        Harness {
            platform,
            llm,
            writer,
            cycles,
            executors,
        }
    }

    pub fn decision(action: ActionKind, params: serde_json::Value) -> Decision {
        let map = params.as_object().cloned().unwrap_or_default();
        Decision::new(action, "test", 0.8, map).unwrap()
    }
}

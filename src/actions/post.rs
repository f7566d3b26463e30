//! 发帖：资料与学习上下文（并行）→ 参考时间线（best-effort）→ 话题搜索（best-effort）
//! → 内容生成 → 发帖 → 互动快照（取不到则全 0）

use crate::actions::{ensure_success, ActionExecutors, ActionOutcome, OutcomeKind, TickContext};
use crate::content::ContentRequest;
use crate::core::{AgentError, Step};
use crate::decision::Decision;

/// 话题搜索结果中带进 prompt 的条数
const TRENDING_SAMPLE: usize = 5;

impl ActionExecutors {
    pub async fn post(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        let timeouts = self.settings.timeouts;
        let profile_step = Step::enrichment("profile", timeouts.platform);
        let (learning, profile) = tokio::join!(
            self.learning_context(ctx),
            profile_step.best_effort(self.platform.get_account_info()),
        );
        let topic = decision
            .topic()
            .map(str::to_string)
            .or_else(|| learning.recent_topics.first().cloned());

        let mut reference_posts = Vec::new();
        if !self.settings.reference_accounts.is_empty() {
            let fetched = Step::enrichment("reference_timeline", timeouts.platform)
                .best_effort(self.platform.get_batch_user_last_tweets(
                    &self.settings.reference_accounts,
                    self.settings.reference_limit,
                ))
                .await
                .unwrap_or_default();
            reference_posts = fetched
                .into_iter()
                .flat_map(|user| user.tweets.into_iter().take(self.settings.reference_limit))
                .map(|tweet| tweet.text)
                .collect();
        }

        let trending_posts = match &topic {
            Some(topic) => self
                .search
                .search(topic, &self.single_search())
                .await
                .into_iter()
                .take(TRENDING_SAMPLE)
                .map(|c| c.text)
                .collect(),
            None => Vec::new(),
        };

        let mut context = learning.to_prompt_fragment();
        if let Some(profile) = &profile {
            context = format!(
                "Account @{} with {} followers.\n{}",
                profile.username, profile.follower_count, context
            );
        }
        let request = ContentRequest {
            context: Some(context),
            reference_posts,
            trending_posts,
            ..ContentRequest::post(self.settings.personality.clone(), topic.clone())
        };

        ctx.check("content_generation")?;
        let generated = match Step::oracle("content_generation", timeouts.generation)
            .run(self.content.generate(&request))
            .await
        {
            Ok(generated) => generated,
            Err(e) => {
                tracing::warn!(error = %e, "content generation failed, waiting");
                let mut outcome = ActionOutcome::wait(format!("Content generation failed: {e}"));
                outcome.topic = topic;
                return Ok(outcome);
            }
        };

        let result = self
            .mutation_step("post", ctx)?
            .run(self.platform.post(&generated.content))
            .await?;
        let result = ensure_success(result)?;

        let engagement = self.engagement_snapshot(result.id.as_deref()).await;

        tracing::info!(posted_id = ?result.id, quality = generated.quality_score, "posted");
        let mut outcome = ActionOutcome::new(OutcomeKind::Post);
        outcome.content = Some(generated.content);
        outcome.posted_id = result.id;
        outcome.topic = topic;
        outcome.engagement = engagement;
        Ok(outcome)
    }
}

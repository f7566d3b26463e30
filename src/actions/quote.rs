//! 引用：扩散搜索 → 选择 → 生成评论 → 引用发布 → 互动快照
//!
//! 评论生成失败时不引用，返回 wait。

use crate::actions::{
    ensure_success, ActionExecutors, ActionOutcome, OutcomeKind, Target, TickContext,
};
use crate::content::ContentRequest;
use crate::core::{AgentError, Step};
use crate::decision::Decision;
use crate::engagement::SearchOptions;

impl ActionExecutors {
    pub async fn quote_tweet(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        let options = SearchOptions::broadened(self.settings.max_search_results);
        let (candidate, selection, query) =
            match self.find_target(decision, OutcomeKind::QuoteTweet, options).await {
                Target::Found { candidate, selection, query } => (candidate, selection, query),
                Target::Skip(outcome) => return Ok(outcome),
            };

        let request = ContentRequest::quote(
            self.settings.personality.clone(),
            candidate.clone(),
            Some(query.clone()),
        );
        ctx.check("quote_commentary")?;
        let commentary = match Step::oracle("quote_commentary", self.settings.timeouts.generation)
            .run(self.content.generate(&request))
            .await
        {
            Ok(generated) => generated.content,
            Err(e) => {
                tracing::warn!(error = %e, tweet_id = %candidate.id, "commentary generation failed, waiting");
                let mut outcome = ActionOutcome::wait(format!("Commentary generation failed: {e}"));
                outcome.topic = Some(query);
                return Ok(outcome);
            }
        };

        let result = self
            .mutation_step("quote_tweet", ctx)?
            .run(self.platform.quote_tweet(&candidate.id, &commentary))
            .await?;
        let result = ensure_success(result)?;

        let engagement = self.engagement_snapshot(result.id.as_deref()).await;

        tracing::info!(tweet_id = %candidate.id, posted_id = ?result.id, "quoted");
        let mut outcome = ActionOutcome::new(OutcomeKind::QuoteTweet);
        outcome.content = Some(commentary);
        outcome.target_tweet_id = Some(candidate.id);
        outcome.target_user_id = Some(candidate.author_id);
        outcome.posted_id = result.id;
        outcome.engagement = engagement;
        outcome.target_engagement = Some(candidate.engagement_metrics);
        outcome.topic = Some(query);
        outcome.selection = Some(selection);
        Ok(outcome)
    }
}

//! 关注：搜索 → 按专业度 / 影响力选择 → 解析作者 id → 关注

use crate::actions::{
    ensure_success, ActionExecutors, ActionOutcome, OutcomeKind, Target, TickContext,
};
use crate::core::AgentError;
use crate::decision::Decision;

impl ActionExecutors {
    pub async fn follow(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        let (candidate, selection, query) =
            match self.find_target(decision, OutcomeKind::Follow, self.single_search()).await {
                Target::Found { candidate, selection, query } => (candidate, selection, query),
                Target::Skip(outcome) => return Ok(outcome),
            };

        // 选择结果里的作者优先，缺失时退回候选自身的作者
        let user_id = if selection.author_id.is_empty() {
            candidate.author_id.clone()
        } else {
            selection.author_id.clone()
        };

        let result = self
            .mutation_step("follow", ctx)?
            .run(self.platform.follow(&user_id))
            .await?;
        ensure_success(result)?;

        tracing::info!(user_id = %user_id, via_tweet = %candidate.id, "followed");
        let mut outcome = ActionOutcome::new(OutcomeKind::Follow);
        outcome.target_user_id = Some(user_id);
        outcome.target_tweet_id = Some(candidate.id);
        outcome.target_engagement = Some(candidate.engagement_metrics);
        outcome.topic = Some(query);
        outcome.selection = Some(selection);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::testing::*;
    use crate::actions::{OutcomeKind, TickContext};
    use crate::decision::ActionKind;
    use crate::llm::ScriptedLlmClient;
    use crate::platform::{Candidate, MockPlatform};
    use serde_json::json;

    #[tokio::test]
    async fn test_follows_author_of_selected_post() {
        let platform = MockPlatform::new().with_default_results(vec![
            Candidate::new("t1", "novice", "hello world"),
            Candidate::new("t2", "expert", "deep dive into pinning"),
        ]);
        let llm = ScriptedLlmClient::always(r#"{"tweetId": "t2", "score": 9.5, "reasoning": "authority"}"#);
        let h = harness(platform, llm, ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .follow(&decision(ActionKind::Follow, json!({"query": "rust async"})), &TickContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.action, OutcomeKind::Follow);
        assert_eq!(outcome.target_user_id.as_deref(), Some("expert"));
        assert_eq!(h.platform.calls(), vec!["search:rust async", "follow:expert"]);
        assert!(h.llm.prompts()[0].contains("expertise and authority"));
    }
}

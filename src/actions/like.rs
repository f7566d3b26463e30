//! 点赞：与转发同一流程，选择标准几乎只看相关性

use crate::actions::{
    ensure_success, ActionExecutors, ActionOutcome, OutcomeKind, Target, TickContext,
};
use crate::core::AgentError;
use crate::decision::Decision;

impl ActionExecutors {
    pub async fn like(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        let (candidate, selection, query) =
            match self.find_target(decision, OutcomeKind::Like, self.single_search()).await {
                Target::Found { candidate, selection, query } => (candidate, selection, query),
                Target::Skip(outcome) => return Ok(outcome),
            };

        let result = self
            .mutation_step("like", ctx)?
            .run(self.platform.like(&candidate.id))
            .await?;
        ensure_success(result)?;

        tracing::info!(tweet_id = %candidate.id, "liked");
        let mut outcome = ActionOutcome::new(OutcomeKind::Like);
        outcome.target_tweet_id = Some(candidate.id);
        outcome.target_user_id = Some(candidate.author_id);
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
    async fn test_like_prompt_carries_relevance_weight() {
        let platform = MockPlatform::new().with_default_results(vec![Candidate::new("t1", "a1", "ownership")]);
        let llm = ScriptedLlmClient::always(r#"{"tweetId": "t1", "score": 6, "reasoning": "ok"}"#);
        let h = harness(platform, llm, ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .like(&decision(ActionKind::Like, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.action, OutcomeKind::Like);
        assert_eq!(h.platform.calls(), vec!["search:rust", "like:t1"]);
        assert!(h.llm.prompts()[0].contains("\"relevanceWeight\": 0.9"));
    }

    #[tokio::test]
    async fn test_no_results_is_wait() {
        let h = harness(MockPlatform::new(), ScriptedLlmClient::failing(), ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .like(&decision(ActionKind::Like, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert!(outcome.is_wait());
        assert_eq!(outcome.reason.as_deref(), Some("No candidates found for query 'rust'"));
        assert_eq!(h.llm.calls(), 0);
    }
}

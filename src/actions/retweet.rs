//! 转发：query → 搜索 → 选择 → 转发

use crate::actions::{
    ensure_success, ActionExecutors, ActionOutcome, OutcomeKind, Target, TickContext,
};
use crate::core::AgentError;
use crate::decision::Decision;

impl ActionExecutors {
    pub async fn retweet(
        &self,
        decision: &Decision,
        ctx: &TickContext,
    ) -> Result<ActionOutcome, AgentError> {
        let (candidate, selection, query) =
            match self.find_target(decision, OutcomeKind::Retweet, self.single_search()).await {
                Target::Found { candidate, selection, query } => (candidate, selection, query),
                Target::Skip(outcome) => return Ok(outcome),
            };

        let result = self
            .mutation_step("retweet", ctx)?
            .run(self.platform.retweet(&candidate.id))
            .await?;
        ensure_success(result)?;

        tracing::info!(tweet_id = %candidate.id, score = selection.score, "retweeted");
        let mut outcome = ActionOutcome::new(OutcomeKind::Retweet);
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
    use crate::core::AgentError;
    use crate::decision::ActionKind;
    use crate::llm::ScriptedLlmClient;
    use crate::platform::{Candidate, EngagementMetrics, MockPlatform, MutationResult};
    use serde_json::json;

    fn pool() -> Vec<Candidate> {
        vec![
            Candidate::new("t1", "a1", "first"),
            Candidate::new("t2", "a2", "second"),
            Candidate::new("t3", "self", "my own"),
        ]
    }

    #[tokio::test]
    async fn test_retweets_scored_candidate() {
        let platform = MockPlatform::new().with_default_results(pool());
        let llm = ScriptedLlmClient::always(r#"{"tweetId": "t2", "score": 8, "reasoning": "fits", "expectedImpact": "high"}"#);
        let h = harness(platform, llm, ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .retweet(&decision(ActionKind::Retweet, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.action, OutcomeKind::Retweet);
        assert_eq!(outcome.target_tweet_id.as_deref(), Some("t2"));
        assert_eq!(outcome.selection.unwrap().score, 8.0);
        assert_eq!(h.platform.calls(), vec!["search:rust", "retweet:t2"]);
    }

    #[tokio::test]
    async fn test_target_metrics_are_not_own_engagement() {
        let mut popular = Candidate::new("t9", "celebrity", "viral");
        popular.engagement_metrics = EngagementMetrics {
            likes: 50_000,
            retweets: 9_000,
            replies: 1_000,
            impressions: 2_000_000,
        };
        let platform = MockPlatform::new().with_default_results(vec![popular.clone()]);
        let h = harness(platform, ScriptedLlmClient::failing(), ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .retweet(&decision(ActionKind::Retweet, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.engagement, EngagementMetrics::default());
        assert_eq!(outcome.target_engagement, Some(popular.engagement_metrics));
    }

    #[tokio::test]
    async fn test_scoring_failure_retweets_first_candidate() {
        let platform = MockPlatform::new().with_default_results(pool());
        let h = harness(platform, ScriptedLlmClient::failing(), ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .retweet(&decision(ActionKind::Retweet, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.target_tweet_id.as_deref(), Some("t1"));
        assert!(outcome.selection.unwrap().is_fallback());
    }

    #[tokio::test]
    async fn test_only_own_posts_is_wait() {
        let platform = MockPlatform::new().with_default_results(vec![Candidate::new("t3", "self", "mine")]);
        let h = harness(platform, ScriptedLlmClient::failing(), ScriptedLlmClient::failing());
        let outcome = h
            .executors
            .retweet(&decision(ActionKind::Retweet, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap();
        assert!(outcome.success && outcome.is_wait());
        assert_eq!(h.platform.count("retweet:"), 0);
    }

    #[tokio::test]
    async fn test_platform_rejection_propagates() {
        let platform = MockPlatform::new()
            .with_default_results(pool())
            .with_mutation_result(MutationResult::failed("Rate limit exceeded"));
        let h = harness(platform, ScriptedLlmClient::failing(), ScriptedLlmClient::failing());
        let err = h
            .executors
            .retweet(&decision(ActionKind::Retweet, json!({"query": "rust"})), &TickContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::PlatformMutation("Rate limit exceeded".into()));
    }
}

//! 流水线集成测试：闸门、决策降级、搜索选择与执行器的端到端行为

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use sparrow::actions::{ActionExecutors, ActionSettings, OutcomeKind};
    use sparrow::config::Timeouts;
    use sparrow::content::LlmContentGenerator;
    use sparrow::core::state::{AccountState, SystemState};
    use sparrow::core::{AgentError, Pipeline};
    use sparrow::cycle::{CycleStore, FileCycleStore, InMemoryCycleStore};
    use sparrow::decision::{ActionKind, Decision, DecisionOracle, DecisionSource, PostingLimits};
    use sparrow::engagement::{CandidateSearch, CandidateSelector, SearchOptions, SelectionCriteria};
    use sparrow::llm::ScriptedLlmClient;
    use sparrow::memory::{FileLearningStore, InMemoryLearningStore, LearningBlender, LearningSource};
    use sparrow::platform::{Candidate, EngagementMetrics, MockPlatform, MutationResult};

    const MS: Duration = Duration::from_millis(200);

    fn timeouts() -> Timeouts {
        Timeouts {
            decision: MS,
            scoring: MS,
            generation: MS,
            analysis: MS,
            platform: MS,
        }
    }

    fn executors(
        platform: Arc<MockPlatform>,
        scoring: Arc<ScriptedLlmClient>,
        writer: Arc<ScriptedLlmClient>,
        cycles: Arc<dyn CycleStore>,
        learning: Arc<dyn LearningSource>,
    ) -> ActionExecutors {
        ActionExecutors::builder(
            platform,
            scoring,
            Arc::new(LlmContentGenerator::new(writer)),
            Arc::new(LearningBlender::new(learning, MS)),
            cycles,
        )
        .self_id("self")
        .settings(ActionSettings {
            analysis_dir: None,
            timeouts: timeouts(),
            ..ActionSettings::default()
        })
        .build()
    }

    fn decision(action: ActionKind, params: serde_json::Value) -> Decision {
        Decision::new(action, "integration", 0.8, params.as_object().cloned().unwrap_or_default())
            .unwrap()
    }

    fn state(posts_today: u32) -> SystemState {
        SystemState::healthy(AccountState {
            posts_today,
            ..AccountState::default()
        })
    }

    #[tokio::test]
    async fn test_post_cap_waits_without_oracle() {
        let platform = Arc::new(MockPlatform::new());
        let decision_llm = Arc::new(ScriptedLlmClient::always(
            r#"{"action": "post", "reasoning": "go", "parameters": {}}"#,
        ));
        let pipeline = Pipeline::new(
            DecisionOracle::new(decision_llm.clone(), MS),
            executors(
                platform.clone(),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(InMemoryCycleStore::new()),
                Arc::new(InMemoryLearningStore::default()),
            ),
            PostingLimits { max_posts_per_day: 5 },
        );

        let report = pipeline.run_tick_with_state(Some(state(5))).await.unwrap();
        assert_eq!(report.decision.action(), ActionKind::Wait);
        assert!(report.decision.reasoning().contains("Daily post limit reached"));
        assert!((report.decision.confidence() - 0.9).abs() < 1e-9);
        assert!(matches!(report.source, DecisionSource::Gated(_)));
        assert_eq!(decision_llm.calls(), 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_retweet_is_wait() {
        let platform = Arc::new(MockPlatform::new());
        let exec = executors(
            platform.clone(),
            Arc::new(ScriptedLlmClient::failing()),
            Arc::new(ScriptedLlmClient::failing()),
            Arc::new(InMemoryCycleStore::new()),
            Arc::new(InMemoryLearningStore::default()),
        );
        let outcome = exec
            .dispatch(&decision(ActionKind::Retweet, json!({"query": ""})))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.action, OutcomeKind::Wait);
        assert_eq!(outcome.reason.as_deref(), Some("No query for retweet action"));
        assert_eq!(platform.count("search:"), 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_only_own_candidates_is_wait() {
        let platform = Arc::new(
            MockPlatform::new().with_default_results(vec![
                Candidate::new("t1", "self", "my post"),
                Candidate::new("t2", "self", "my other post"),
            ]),
        );
        let exec = executors(
            platform.clone(),
            Arc::new(ScriptedLlmClient::failing()),
            Arc::new(ScriptedLlmClient::always(r#"{"content": "nice"}"#)),
            Arc::new(InMemoryCycleStore::new()),
            Arc::new(InMemoryLearningStore::default()),
        );
        for action in [ActionKind::QuoteTweet, ActionKind::Like, ActionKind::Follow] {
            let outcome = exec
                .dispatch(&decision(action, json!({"query": "rust"})))
                .await
                .unwrap();
            assert!(outcome.success);
            assert_eq!(outcome.action, OutcomeKind::Wait, "{action}");
        }
        assert_eq!(platform.count("quote:"), 0);
        assert_eq!(platform.count("like:"), 0);
        assert_eq!(platform.count("follow:"), 0);
    }

    #[tokio::test]
    async fn test_rejected_post_carries_message() {
        let platform = Arc::new(
            MockPlatform::new().with_mutation_result(MutationResult::failed("Rate limit exceeded")),
        );
        let exec = executors(
            platform,
            Arc::new(ScriptedLlmClient::failing()),
            Arc::new(ScriptedLlmClient::always(r#"{"content": "hello world"}"#)),
            Arc::new(InMemoryCycleStore::new()),
            Arc::new(InMemoryLearningStore::default()),
        );
        let err = exec
            .dispatch(&decision(ActionKind::Post, json!({"topic": "rust"})))
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::PlatformMutation("Rate limit exceeded".into()));
        assert!(err.to_string().contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_fanout_dedups_and_drops_self() {
        let platform = Arc::new(
            MockPlatform::new()
                .with_results("rust", vec![Candidate::new("t1", "a", "x"), Candidate::new("t9", "self", "mine")])
                .with_results("rust -is:retweet", vec![Candidate::new("t1", "a", "x"), Candidate::new("t2", "b", "y")])
                .with_failing_query("rust min_faves:10"),
        );
        let search = CandidateSearch::new(platform, "self", MS);
        let got = search.search("rust", &SearchOptions::broadened(20)).await;
        let ids: Vec<&str> = got.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_selection_is_deterministic_with_stubbed_scoring() {
        let pool = vec![
            Candidate::new("t1", "a", "first"),
            Candidate::new("t2", "b", "second"),
            Candidate::new("t3", "c", "third"),
        ];
        let platform = Arc::new(MockPlatform::new().with_default_results(pool));
        let criteria = SelectionCriteria::for_action(ActionKind::Like, "rust");
        let reply = r#"{"tweetId": "t3", "score": 7.5, "reasoning": "closest match", "expectedImpact": "medium"}"#;

        let mut selections = Vec::new();
        for _ in 0..3 {
            let search = CandidateSearch::new(platform.clone(), "self", MS);
            let selector = CandidateSelector::new(Arc::new(ScriptedLlmClient::always(reply)), MS);
            let candidates = search.search("rust", &SearchOptions::single(20)).await;
            selections.push(selector.select(&candidates, &criteria).await.unwrap());
        }
        assert!(selections.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(selections[0].tweet_id, "t3");
    }

    #[tokio::test]
    async fn test_scoring_failure_score_is_five() {
        let selector = CandidateSelector::new(Arc::new(ScriptedLlmClient::failing()), MS);
        let criteria = SelectionCriteria::for_action(ActionKind::Retweet, "rust");
        let got = selector
            .select(&[Candidate::new("t1", "a", "x")], &criteria)
            .await
            .unwrap();
        assert_eq!(got.score, 5.0);
        assert!(got.reasoning.contains("fallback"));
    }

    #[tokio::test]
    async fn test_oracle_garbage_and_schema_fallbacks() {
        let oracle = DecisionOracle::new(Arc::new(ScriptedLlmClient::always("no json here")), MS);
        let pipeline = Pipeline::new(
            oracle,
            executors(
                Arc::new(MockPlatform::new()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(InMemoryCycleStore::new()),
                Arc::new(InMemoryLearningStore::default()),
            ),
            PostingLimits::default(),
        );
        let report = pipeline.run_tick_with_state(Some(state(0))).await.unwrap();
        assert_eq!(report.decision.action(), ActionKind::Wait);
        assert_eq!(report.decision.confidence(), 0.5);

        let oracle = DecisionOracle::new(
            Arc::new(ScriptedLlmClient::always(
                r#"{"action": "dance", "reasoning": "why not", "parameters": {}}"#,
            )),
            MS,
        );
        let pipeline = Pipeline::new(
            oracle,
            executors(
                Arc::new(MockPlatform::new()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(InMemoryCycleStore::new()),
                Arc::new(InMemoryLearningStore::default()),
            ),
            PostingLimits::default(),
        );
        let report = pipeline.run_tick_with_state(Some(state(0))).await.unwrap();
        assert_eq!(report.decision.confidence(), 0.6);
        assert_eq!(report.decision.reasoning(), "Invalid decision format");
    }

    #[tokio::test]
    async fn test_file_backed_ticks_feed_learning_back() {
        let dir = tempfile::tempdir().unwrap();
        let cycles = Arc::new(FileCycleStore::new(dir.path().join("cycles")));
        let learning = Arc::new(FileLearningStore::new(dir.path().join("learning")));
        let platform = Arc::new(MockPlatform::new());
        let decision_llm = Arc::new(ScriptedLlmClient::always(
            r#"{"action": "post", "reasoning": "share a tip", "confidence": 1.5, "parameters": {"topic": "ownership"}}"#,
        ));
        let pipeline = Pipeline::new(
            DecisionOracle::new(decision_llm.clone(), MS),
            executors(
                platform.clone(),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(ScriptedLlmClient::always(r#"{"content": "Move semantics in one picture #rust"}"#)),
                cycles.clone(),
                learning.clone(),
            ),
            PostingLimits { max_posts_per_day: 2 },
        );

        let first = pipeline.run_tick().await.unwrap();
        assert_eq!(first.outcome.action, OutcomeKind::Post);
        assert_eq!(first.decision.confidence(), 1.0);
        let second = pipeline.run_tick().await.unwrap();
        assert_eq!(second.outcome.action, OutcomeKind::Post);

        // 当天已发 2 条，第三个 tick 被闸门拦下
        let third = pipeline.run_tick().await.unwrap();
        assert!(matches!(third.source, DecisionSource::Gated(_)));
        assert_eq!(platform.count("post:"), 2);
        assert_eq!(decision_llm.calls(), 2);

        let topics = learning.load_successful_topics().await.unwrap();
        assert_eq!(topics.len(), 2);
        assert!(decision_llm.prompts()[1].contains("ownership"));
    }

    #[tokio::test]
    async fn test_retweet_tick_keeps_target_metrics_out_of_learning() {
        let mut viral = Candidate::new("t1", "someone_else", "hot take");
        viral.engagement_metrics = EngagementMetrics {
            likes: 50_000,
            retweets: 9_000,
            replies: 1_000,
            impressions: 0,
        };
        let learning = Arc::new(InMemoryLearningStore::default());
        let pipeline = Pipeline::new(
            DecisionOracle::new(
                Arc::new(ScriptedLlmClient::always(
                    r#"{"action": "retweet", "reasoning": "amplify", "parameters": {"query": "rust"}}"#,
                )),
                MS,
            ),
            executors(
                Arc::new(MockPlatform::new().with_default_results(vec![viral])),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(ScriptedLlmClient::failing()),
                Arc::new(InMemoryCycleStore::new()),
                learning.clone(),
            ),
            PostingLimits::default(),
        );
        let report = pipeline.run_tick_with_state(Some(state(0))).await.unwrap();
        assert_eq!(report.outcome.action, OutcomeKind::Retweet);
        assert_eq!(report.outcome.target_engagement.map(|m| m.total()), Some(60_000));
        assert!(learning.patterns().is_empty());
        assert_eq!(learning.topics()[0].engagement, 0.0);
    }
}

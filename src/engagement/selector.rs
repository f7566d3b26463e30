//! 候选选择：把候选与选择标准交给打分服务，取回一条带分数的选择
//!
//! 打分服务任何失败（超时、无法解析、返回的 id 不在候选集中）都降级为第一个候选，
//! 分数 5、理由 "fallback selection"、预期影响 "medium"。分数总被截到 [0, 10]。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::SelectionCriteria;
use crate::core::Step;
use crate::llm::{parse_json_object, LlmClient, Message};
use crate::platform::Candidate;

pub const FALLBACK_SCORE: f64 = 5.0;
pub const FALLBACK_REASONING: &str = "fallback selection";
pub const FALLBACK_IMPACT: &str = "medium";
pub const MAX_SCORE: f64 = 10.0;

const SCORING_INSTRUCTION: &str = "You rank social media posts for an autonomous account. \
Pick the single best candidate for the given criteria. Score it from 0 to 10. \
Reply with ONLY a JSON object: {\"tweetId\": string, \"score\": number, \"reasoning\": string, \"expectedImpact\": \"low\"|\"medium\"|\"high\"}.";

/// 被选中的候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub tweet_id: String,
    pub author_id: String,
    pub score: f64,
    pub reasoning: String,
    pub expected_impact: String,
}

impl Selection {
    pub fn fallback(candidate: &Candidate) -> Self {
        Self {
            tweet_id: candidate.id.clone(),
            author_id: candidate.author_id.clone(),
            score: FALLBACK_SCORE,
            reasoning: FALLBACK_REASONING.to_string(),
            expected_impact: FALLBACK_IMPACT.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.reasoning == FALLBACK_REASONING
    }
}

pub struct CandidateSelector {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl CandidateSelector {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub fn build_messages(candidates: &[Candidate], criteria: &SelectionCriteria) -> Vec<Message> {
        let listing: Vec<Value> = candidates
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "authorId": c.author_id,
                    "author": c.author_username,
                    "text": c.text,
                    "metrics": c.engagement_metrics,
                    "relevanceScore": c.relevance_score,
                })
            })
            .collect();
        let user = format!(
            "Criteria:\n{}\n\nCandidates:\n{}",
            serde_json::to_string_pretty(criteria).unwrap_or_default(),
            serde_json::to_string_pretty(&listing).unwrap_or_default()
        );
        vec![Message::system(SCORING_INSTRUCTION), Message::user(user)]
    }

    /// 候选为空时返回 None；否则一定有结果
    pub async fn select(
        &self,
        candidates: &[Candidate],
        criteria: &SelectionCriteria,
    ) -> Option<Selection> {
        let first = candidates.first()?;
        let messages = Self::build_messages(candidates, criteria);

        let raw = match Step::oracle("scoring", self.timeout)
            .run(self.llm.complete(&messages))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "scoring service failed, using fallback selection");
                return Some(Selection::fallback(first));
            }
        };

        match parse_selection(&raw, candidates) {
            Ok(selection) => {
                tracing::info!(
                    tweet_id = %selection.tweet_id,
                    score = selection.score,
                    "candidate selected"
                );
                Some(selection)
            }
            Err(e) => {
                tracing::warn!(error = %e, "scoring output rejected, using fallback selection");
                Some(Selection::fallback(first))
            }
        }
    }
}

/// 解析打分输出；tweetId 必须属于候选集
pub fn parse_selection(raw: &str, candidates: &[Candidate]) -> Result<Selection, String> {
    let value = parse_json_object(raw)?;
    let tweet_id = value
        .get("tweetId")
        .or_else(|| value.get("tweet_id"))
        .or_else(|| value.get("id"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| "missing tweetId".to_string())?;
    let candidate = candidates
        .iter()
        .find(|c| c.id == tweet_id)
        .ok_or_else(|| format!("tweetId '{tweet_id}' is not a candidate"))?;

    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .unwrap_or(FALLBACK_SCORE)
        .clamp(0.0, MAX_SCORE);
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let expected_impact = value
        .get("expectedImpact")
        .or_else(|| value.get("expected_impact"))
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_IMPACT)
        .to_string();

    Ok(Selection {
        tweet_id,
        author_id: candidate.author_id.clone(),
        score,
        reasoning,
        expected_impact,
    })
}

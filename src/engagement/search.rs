//! 候选搜索：单查询或多查询并行扩散，合并、按 id 去重（后写覆盖），过滤掉自己的内容
//!
//! 每个分支各自持有结果槽，join 后再合并；单个分支失败记 warn 并当作空结果。
//! 过滤后为空不是错误，由调用方转成 wait。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::core::Step;
use crate::platform::{Candidate, SearchParams, SocialPlatform};

/// 扩散模式下在原查询之外追加的固定变体
pub const BROADENED_QUERY_TEMPLATES: [&str; 3] = [
    "{query} -is:retweet",
    "{query} min_faves:10",
    "#{tag}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// 只发一个查询
    Single,
    /// 原查询 + BROADENED_QUERY_TEMPLATES，并行执行
    Broadened,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub mode: SearchMode,
    /// 每个查询的结果条数上限
    pub max_results: usize,
}

impl SearchOptions {
    pub fn single(max_results: usize) -> Self {
        Self {
            mode: SearchMode::Single,
            max_results,
        }
    }

    pub fn broadened(max_results: usize) -> Self {
        Self {
            mode: SearchMode::Broadened,
            max_results,
        }
    }
}

/// 扩散查询列表（首项为原查询，去掉重复）
pub fn expand_queries(query: &str, mode: SearchMode) -> Vec<String> {
    let query = query.trim();
    let mut queries = vec![query.to_string()];
    if mode == SearchMode::Broadened {
        let tag: String = query.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
        for template in BROADENED_QUERY_TEMPLATES {
            // 没有可用字符时只跳过 hashtag 变体
            if template.contains("{tag}") && tag.is_empty() {
                continue;
            }
            let q = template.replace("{query}", query).replace("{tag}", &tag);
            if !queries.contains(&q) {
                queries.push(q);
            }
        }
    }
    queries
}

/// 合并多个分支结果：按 id 去重（后出现的覆盖先出现的，位置保持首次出现处），再剔除 self_id 的内容
pub fn merge_candidates(batches: Vec<Vec<Candidate>>, self_id: &str) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for candidate in batches.into_iter().flatten() {
        match index.get(&candidate.id) {
            Some(&i) => merged[i] = candidate,
            None => {
                index.insert(candidate.id.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }
    merged.retain(|c| c.author_id != self_id);
    merged
}

pub struct CandidateSearch {
    platform: Arc<dyn SocialPlatform>,
    self_id: String,
    timeout: Duration,
}

impl CandidateSearch {
    pub fn new(platform: Arc<dyn SocialPlatform>, self_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            platform,
            self_id: self_id.into(),
            timeout,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<Candidate> {
        let queries = expand_queries(query, options.mode);
        let params = SearchParams {
            max_results: options.max_results,
        };
        let step = Step::enrichment("search", self.timeout);

        let branches = queries.iter().map(|q| {
            let params = &params;
            async move {
                match step.run(self.platform.search(q, params)).await {
                    Ok(mut results) => {
                        results.truncate(params.max_results);
                        results
                    }
                    Err(e) => {
                        tracing::warn!(query = %q, error = %e, "search branch failed, treating as empty");
                        Vec::new()
                    }
                }
            }
        });
        let batches = join_all(branches).await;

        let merged = merge_candidates(batches, &self.self_id);
        tracing::info!(query = %query, branches = queries.len(), candidates = merged.len(), "search finished");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MockPlatform;

    #[test]
    fn test_expand_single_and_broadened() {
        assert_eq!(expand_queries(" rust ", SearchMode::Single), vec!["rust"]);
        let q = expand_queries("rust lang", SearchMode::Broadened);
        assert_eq!(
            q,
            vec!["rust lang", "rust lang -is:retweet", "rust lang min_faves:10", "#rustlang"]
        );
    }

    #[test]
    fn test_symbol_only_query_keeps_non_hashtag_variants() {
        let q = expand_queries("$$$", SearchMode::Broadened);
        assert_eq!(q, vec!["$$$", "$$$ -is:retweet", "$$$ min_faves:10"]);
    }

    #[test]
    fn test_merge_dedups_last_write_wins_and_drops_self() {
        let mut updated = Candidate::new("1", "a", "second version");
        updated.relevance_score = Some(0.9);
        let merged = merge_candidates(
            vec![
                vec![Candidate::new("1", "a", "first version"), Candidate::new("2", "me", "mine")],
                vec![Candidate::new("3", "b", "other"), updated.clone()],
            ],
            "me",
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], updated);
        assert_eq!(merged[1].id, "3");
    }

    #[tokio::test]
    async fn test_failed_branch_does_not_fail_fanout() {
        let platform = MockPlatform::new()
            .with_results("rust", vec![Candidate::new("1", "a", "x")])
            .with_failing_query("rust -is:retweet")
            .with_results("rust min_faves:10", vec![Candidate::new("1", "a", "x"), Candidate::new("2", "b", "y")])
            .with_results("#rust", vec![Candidate::new("3", "self", "own post")]);
        let platform = Arc::new(platform);
        let search = CandidateSearch::new(platform.clone(), "self", Duration::from_secs(1));
        let got = search.search("rust", &SearchOptions::broadened(10)).await;
        let ids: Vec<&str> = got.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(platform.count("search:"), 4);
    }

    #[tokio::test]
    async fn test_only_own_content_yields_empty() {
        let platform = MockPlatform::new()
            .with_default_results(vec![Candidate::new("9", "self", "mine")]);
        let search = CandidateSearch::new(Arc::new(platform), "self", Duration::from_secs(1));
        assert!(search.search("rust", &SearchOptions::single(5)).await.is_empty());
    }

    #[tokio::test]
    async fn test_results_capped_per_query() {
        let many: Vec<Candidate> = (0..10).map(|i| Candidate::new(i.to_string(), "a", "t")).collect();
        let platform = MockPlatform::new().with_default_results(many);
        let search = CandidateSearch::new(Arc::new(platform), "self", Duration::from_secs(1));
        assert_eq!(search.search("rust", &SearchOptions::single(3)).await.len(), 3);
    }
}

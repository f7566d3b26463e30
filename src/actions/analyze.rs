//! 分析：汇总近期动作指标 → 请求分析服务 → 结果落盘（best-effort）
//!
//! 落盘失败不影响已经得到的分析结果。定时版本在此之后再单独归档当前周期，
//! 归档失败同样只记日志。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Value};

use crate::actions::{ActionExecutors, ActionOutcome, OutcomeKind};
use crate::core::{AgentError, Step};
use crate::llm::{parse_json_object, Message};

/// 参与统计的最近周期数
pub const RECENT_OUTCOME_WINDOW: usize = 50;

const ANALYSIS_INSTRUCTION: &str = "You review the recent activity of an autonomous social media account. \
Identify what worked, what did not, and what to try next. \
Reply with ONLY a JSON object: {\"summary\": string, \"insights\": [string], \"recommendations\": [string]}.";

impl ActionExecutors {
    pub async fn analyze(&self) -> Result<ActionOutcome, AgentError> {
        let metrics = self.collect_metrics().await;
        let messages = vec![
            Message::system(ANALYSIS_INSTRUCTION),
            Message::user(format!(
                "Recent activity metrics:\n{}",
                serde_json::to_string_pretty(&metrics).unwrap_or_default()
            )),
        ];

        let raw = match Step::oracle("analysis", self.settings.timeouts.analysis)
            .run(self.analyst.complete(&messages))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "analysis service failed");
                let mut outcome = ActionOutcome::failed(OutcomeKind::Analyze, e.to_string());
                outcome.analysis = Some(json!({ "metrics": metrics }));
                return Ok(outcome);
            }
        };
        let report = parse_json_object(&raw).unwrap_or_else(|_| json!({ "summary": raw.trim() }));
        let analysis = json!({ "metrics": metrics, "report": report });

        if let Some(dir) = &self.settings.analysis_dir {
            let saved = Step::persistence("analysis_persist", self.settings.timeouts.platform)
                .best_effort(persist_analysis(dir, &analysis))
                .await;
            if let Some(path) = saved {
                tracing::info!(path = %path.display(), "analysis saved");
            }
        }

        let mut outcome = ActionOutcome::new(OutcomeKind::Analyze);
        outcome.analysis = Some(analysis);
        Ok(outcome)
    }

    /// 定时分析：分析完成后独立地归档当前周期
    pub async fn analyze_scheduled(&self) -> Result<ActionOutcome, AgentError> {
        let outcome = self.analyze().await?;
        let archived = Step::persistence("archive_current", self.settings.timeouts.platform)
            .best_effort(self.cycles.archive_current())
            .await;
        match archived {
            Some(Some(id)) => tracing::info!(cycle_id = %id, "current cycle archived after analysis"),
            Some(None) => tracing::info!("no current cycle to archive"),
            None => {}
        }
        Ok(outcome)
    }

    /// 近期动作按类型计数、成功率，以及学习数据中的平均互动
    async fn collect_metrics(&self) -> Value {
        let timeout = self.settings.timeouts.platform;
        let outcomes_step = Step::persistence("recent_outcomes", timeout);
        let patterns_step = Step::persistence("engagement_patterns", timeout);
        let (outcomes, patterns) = tokio::join!(
            outcomes_step.best_effort(self.cycles.recent_outcomes(RECENT_OUTCOME_WINDOW)),
            patterns_step.best_effort(self.learning.source().load_engagement_patterns()),
        );
        let outcomes = outcomes.unwrap_or_default();
        let patterns = patterns.unwrap_or_default();

        let mut by_action: BTreeMap<&'static str, usize> = BTreeMap::new();
        for outcome in &outcomes {
            *by_action.entry(outcome.action.as_str()).or_default() += 1;
        }
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let avg_engagement = if patterns.is_empty() {
            0.0
        } else {
            patterns.iter().map(|p| p.engagement).sum::<f64>() / patterns.len() as f64
        };
        let topics: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.success && !o.is_wait())
            .filter_map(|o| o.topic.as_deref())
            .collect();

        json!({
            "totalCycles": outcomes.len(),
            "successful": succeeded,
            "byAction": by_action,
            "avgEngagement": avg_engagement,
            "recentTopics": topics,
        })
    }
}

/// 写入 `<dir>/<timestamp>.json`
async fn persist_analysis(dir: &Path, analysis: &Value) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
    tokio::fs::write(&path, serde_json::to_vec_pretty(analysis)?).await?;
    Ok(path)
}

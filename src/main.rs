//! Sparrow 调度主程序
//!
//! 初始化日志 → 加载配置 → 组装平台 / LLM / 存储 → 按固定间隔逐个执行 tick。
//! 每个 tick 受总预算约束，失败只记日志，循环继续；Ctrl+C 在 tick 之间优雅退出。
//!
//! 参数：`--once` 只执行一次 tick；`--analyze` 执行一次定时分析后退出；`--config <path>` 追加配置文件。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sparrow::actions::{ActionExecutors, ActionSettings};
use sparrow::config::{load_config, reload_config, AppConfig};
use sparrow::content::LlmContentGenerator;
use sparrow::core::Pipeline;
use sparrow::cycle::FileCycleStore;
use sparrow::decision::{DecisionOracle, PostingLimits};
use sparrow::llm::{create_llm_from_config, LlmClient};
use sparrow::memory::{FileLearningStore, LearningBlender};
use sparrow::observability;
use sparrow::platform::{HttpPlatformClient, SocialPlatform};
use tokio_util::sync::CancellationToken;

struct Args {
    once: bool,
    analyze: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        once: false,
        analyze: false,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--once" => args.once = true,
            "--analyze" => args.analyze = true,
            "--config" => args.config = iter.next().map(PathBuf::from),
            other => tracing::warn!(arg = %other, "ignoring unknown argument"),
        }
    }
    args
}

async fn build_pipeline(cfg: &AppConfig) -> anyhow::Result<(Pipeline, Arc<dyn LlmClient>)> {
    let timeouts = cfg.timeouts();
    let data_dir = cfg.app.data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

    let llm = create_llm_from_config(cfg);
    let api_key = std::env::var(&cfg.platform.api_key_env).ok();
    let platform: Arc<dyn SocialPlatform> = Arc::new(
        HttpPlatformClient::new(&cfg.platform.base_url, api_key, timeouts.platform)
            .map_err(anyhow::Error::msg)
            .context("Failed to create platform client")?,
    );

    // 配置未给出自身账号 id 时向平台查询一次，用于过滤自己的内容
    let mut self_id = cfg.platform.account_id.clone();
    if self_id.is_empty() {
        match platform.get_account_info().await {
            Ok(info) => self_id = info.id,
            Err(e) => tracing::warn!(error = %e, "could not resolve own account id; self-filter disabled"),
        }
    }

    let learning = Arc::new(LearningBlender::new(
        Arc::new(FileLearningStore::new(data_dir.join("learning"))),
        timeouts.platform,
    ));
    let cycles = Arc::new(FileCycleStore::new(data_dir.join("cycles")));
    let executors = ActionExecutors::builder(
        platform,
        llm.clone(),
        Arc::new(LlmContentGenerator::new(llm.clone())),
        learning,
        cycles,
    )
    .self_id(self_id)
    .settings(ActionSettings::from_config(cfg))
    .build();

    let pipeline = Pipeline::new(
        DecisionOracle::new(llm.clone(), timeouts.decision),
        executors,
        PostingLimits {
            max_posts_per_day: cfg.agent.max_posts_per_day,
        },
    );
    Ok((pipeline, llm))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let args = parse_args();

    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    let (mut pipeline, mut llm) = build_pipeline(&cfg).await?;

    if args.analyze {
        let outcome = pipeline
            .run_analysis(true)
            .await
            .context("Analysis failed")?;
        tracing::info!(success = outcome.success, "analysis finished");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            tracing::info!("Received Ctrl+C, stopping after the current tick...");
            signal_token.cancel();
        }
    });

    loop {
        let budget = Duration::from_secs(cfg.agent.tick_budget_secs);
        match pipeline.run_tick_within(budget).await {
            Ok(report) => tracing::info!(
                cycle_id = %report.cycle_id,
                action = %report.outcome.action,
                success = report.outcome.success,
                "tick complete"
            ),
            Err(e) => tracing::error!(error = %e, "tick failed"),
        }
        let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
        tracing::info!(prompt_tokens, completion_tokens, total_tokens, "llm token usage so far");

        if args.once {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(cfg.agent.tick_interval_secs)) => {}
        }

        // 限额与节奏可在运行中调整；重载失败时沿用旧配置
        if args.config.is_none() {
            match reload_config() {
                Ok(next) => {
                    if next.agent.max_posts_per_day != cfg.agent.max_posts_per_day {
                        tracing::info!(max_posts_per_day = next.agent.max_posts_per_day, "config reloaded, rebuilding pipeline");
                        match build_pipeline(&next).await {
                            Ok((p, l)) => {
                                pipeline = p;
                                llm = l;
                            }
                            Err(e) => tracing::warn!(error = %e, "rebuild failed, keeping previous pipeline"),
                        }
                    }
                    cfg = next;
                }
                Err(e) => tracing::warn!(error = %e, "config reload failed, keeping previous config"),
            }
        }
    }

    tracing::info!("sparrow stopped");
    Ok(())
}

//! 可观测性：tracing 订阅器初始化
//!
//! 默认级别 info，RUST_LOG 可覆盖；SPARROW_LOG_JSON=1 时输出 JSON 行，便于采集审计日志。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// 构造过滤器：优先 RUST_LOG，未设置或无法解析时用 info
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 全局初始化；重复调用时静默忽略（测试中可能多次进入）
pub fn init() {
    let json = std::env::var("SPARROW_LOG_JSON").is_ok_and(|v| v == "1");
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}

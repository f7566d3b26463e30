//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SPARROW__*` 覆盖（双下划线表示嵌套，如 `SPARROW__AGENT__MAX_POSTS_PER_DAY=8`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub platform: PlatformSection,
}

/// [app] 段：应用名、数据目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 周期文档、学习数据、分析结果的根目录，未设置时用 ./data
    pub data_dir: Option<PathBuf>,
}

impl AppSection {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}

/// [llm] 段：后端选择与各类外部调用的超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 采样温度；决策与打分都需要稳定输出，默认偏低
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub deepseek: LlmModelSection,
    #[serde(default)]
    pub openai: LlmModelSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            deepseek: LlmModelSection::default(),
            openai: LlmModelSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    crate::llm::DEFAULT_TEMPERATURE
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmModelSection {
    pub model: Option<String>,
}

/// 超时（秒）：决策、打分、内容生成、分析
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_decision_timeout")]
    pub decision: u64,
    #[serde(default = "default_scoring_timeout")]
    pub scoring: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation: u64,
    #[serde(default = "default_analysis_timeout")]
    pub analysis: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            decision: default_decision_timeout(),
            scoring: default_scoring_timeout(),
            generation: default_generation_timeout(),
            analysis: default_analysis_timeout(),
        }
    }
}

fn default_decision_timeout() -> u64 {
    10
}

fn default_scoring_timeout() -> u64 {
    10
}

fn default_generation_timeout() -> u64 {
    30
}

fn default_analysis_timeout() -> u64 {
    30
}

/// [agent] 段：发帖上限、调度节奏、人设与参考账号
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_posts_per_day")]
    pub max_posts_per_day: u32,
    /// 两次 tick 之间的间隔（秒）
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// 单次 tick 的总预算（秒），超出后放弃本次 tick
    #[serde(default = "default_tick_budget_secs")]
    pub tick_budget_secs: u64,
    /// 内容生成使用的人设描述
    #[serde(default = "default_personality")]
    pub personality: String,
    /// 发帖前拉取其最近推文作为风格参考的账号（best-effort）
    #[serde(default)]
    pub reference_accounts: Vec<String>,
    /// 每次参考拉取的条数
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_posts_per_day: default_max_posts_per_day(),
            tick_interval_secs: default_tick_interval_secs(),
            tick_budget_secs: default_tick_budget_secs(),
            personality: default_personality(),
            reference_accounts: Vec::new(),
            reference_limit: default_reference_limit(),
        }
    }
}

fn default_max_posts_per_day() -> u32 {
    5
}

fn default_tick_interval_secs() -> u64 {
    30 * 60
}

fn default_tick_budget_secs() -> u64 {
    180
}

fn default_personality() -> String {
    "A curious, concise technology commentator who shares practical insights.".to_string()
}

fn default_reference_limit() -> usize {
    5
}

/// [platform] 段：平台 API 地址、自身账号、请求超时、搜索条数上限
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSection {
    #[serde(default = "default_platform_base_url")]
    pub base_url: String,
    /// 自身账号 id（用于过滤自己的内容）
    #[serde(default)]
    pub account_id: String,
    /// 存放 Bearer Token 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 单次搜索返回条数上限
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            base_url: default_platform_base_url(),
            account_id: String::new(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            max_search_results: default_max_search_results(),
        }
    }
}

fn default_platform_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "SPARROW_PLATFORM_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_search_results() -> usize {
    20
}

/// 运行期超时集合，由配置换算为 Duration 后传给各组件
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub decision: Duration,
    pub scoring: Duration,
    pub generation: Duration,
    pub analysis: Duration,
    pub platform: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        AppConfig::default().timeouts()
    }
}

impl AppConfig {
    pub fn timeouts(&self) -> Timeouts {
        let t = &self.llm.timeouts;
        Timeouts {
            decision: Duration::from_secs(t.decision),
            scoring: Duration::from_secs(t.scoring),
            generation: Duration::from_secs(t.generation),
            analysis: Duration::from_secs(t.analysis),
            platform: Duration::from_secs(self.platform.request_timeout_secs),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SPARROW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SPARROW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    if let Some(name) = default_names
        .into_iter()
        .find(|name| std::path::Path::new(&format!("{}.toml", name)).exists())
    {
        builder = builder.add_source(config::File::with_name(name).required(false));
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SPARROW")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 重新从磁盘与环境变量加载配置（调度循环可在 tick 之间调用以热更新限额）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}

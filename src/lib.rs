//! Sparrow - Rust 社交平台自主运营智能体
//!
//! 模块划分：
//! - **actions**: 动作执行器（发帖、转发、点赞、引用、关注、分析）与统一结果信封
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **content**: 内容生成（发帖正文、引用评论）
//! - **core**: 错误分类、步骤组合子、状态快照、tick 流水线
//! - **cycle**: 执行周期协调（单一当前周期、按日期归档）
//! - **decision**: 约束闸门、决策服务适配、输出解析
//! - **engagement**: 候选搜索与打分选择
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 学习数据与上下文合成
//! - **observability**: 日志初始化
//! - **platform**: 社交平台 API 抽象、HTTP 实现与内存实现

pub mod actions;
pub mod config;
pub mod content;
pub mod core;
pub mod cycle;
pub mod decision;
pub mod engagement;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod platform;

pub use actions::{ActionExecutors, ActionOutcome, OutcomeKind};
pub use crate::core::{AgentError, Pipeline, TickReport};
pub use decision::{ActionKind, Decision};

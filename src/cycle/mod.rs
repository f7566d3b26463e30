//! 执行周期协调器
//!
//! 任一时刻只有一个「当前周期」。initialize_cycle 先把上一个周期归档到按日期划分的目录，
//! 再创建新周期并返回 CycleHandle；本 tick 的所有持久化都必须持有这个句柄。
//! 每个周期只保存一个 ActionOutcome（覆盖写入，不追加）。

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::ActionOutcome;

pub use file::FileCycleStore;
pub use memory::InMemoryCycleStore;

/// 当前周期的句柄；不可 Clone，按引用在一次 tick 内传递
#[derive(Debug, PartialEq, Eq)]
pub struct CycleHandle {
    id: String,
    started_at: DateTime<Utc>,
}

impl CycleHandle {
    pub fn new(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// 一个周期的持久化文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDocument {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub outcome: Option<ActionOutcome>,
}

impl CycleDocument {
    pub fn open(handle: &CycleHandle) -> Self {
        Self {
            cycle_id: handle.id.clone(),
            started_at: handle.started_at,
            outcome: None,
        }
    }

    /// 归档目录名（YYYY-MM-DD，按周期开始日期）
    pub fn bucket(&self) -> String {
        self.started_at.format("%Y-%m-%d").to_string()
    }

    /// 是否为指定日期内的一次成功发帖
    pub fn is_post_on(&self, date: NaiveDate) -> bool {
        self.outcome.as_ref().is_some_and(|o| {
            o.success
                && o.action == crate::actions::OutcomeKind::Post
                && o.timestamp.date_naive() == date
        })
    }
}

/// 新周期 id：时间戳前缀便于人工排序，uuid 保证唯一
pub fn new_cycle_id(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.format("%Y%m%dT%H%M%S"), uuid::Uuid::new_v4().simple())
}

#[async_trait]
pub trait CycleStore: Send + Sync {
    /// 归档上一个周期（若有），再创建新周期
    async fn initialize_cycle(&self) -> Result<CycleHandle, String>;

    /// 把结果写入句柄对应的周期；句柄已不是当前周期时报错
    async fn save_action_outcome(
        &self,
        cycle: &CycleHandle,
        outcome: &ActionOutcome,
    ) -> Result<(), String>;

    /// 仅归档当前周期，不创建新周期；返回被归档的周期 id
    async fn archive_current(&self) -> Result<Option<String>, String>;

    /// 指定日期内成功发帖的次数（含当前周期）
    async fn posts_on(&self, date: NaiveDate) -> Result<u32, String>;

    /// 最近的若干结果，按时间倒序（含当前周期）
    async fn recent_outcomes(&self, limit: usize) -> Result<Vec<ActionOutcome>, String>;
}

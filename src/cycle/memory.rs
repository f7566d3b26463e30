//! 内存周期存储（测试用）

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{new_cycle_id, CycleDocument, CycleHandle, CycleStore};
use crate::actions::ActionOutcome;

#[derive(Debug, Default)]
pub struct InMemoryCycleStore {
    current: Mutex<Option<CycleDocument>>,
    /// (归档目录名, 文档)
    archive: Mutex<Vec<(String, CycleDocument)>>,
    fail_saves: AtomicBool,
    fail_archive: AtomicBool,
}

impl InMemoryCycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让之后的 save_action_outcome 全部失败
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// 让之后的 archive_current 全部失败（initialize_cycle 不受影响）
    pub fn fail_archive(&self) {
        self.fail_archive.store(true, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<CycleDocument> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    pub fn archived(&self) -> Vec<(String, CycleDocument)> {
        self.archive.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// 直接放入一份已归档文档（用于构造历史）
    pub fn seed_archive(&self, doc: CycleDocument) {
        if let Ok(mut archive) = self.archive.lock() {
            archive.push((doc.bucket(), doc));
        }
    }

    fn take_current(&self) -> Result<Option<String>, String> {
        let mut current = self.current.lock().map_err(|e| e.to_string())?;
        let Some(doc) = current.take() else {
            return Ok(None);
        };
        let id = doc.cycle_id.clone();
        self.archive
            .lock()
            .map_err(|e| e.to_string())?
            .push((doc.bucket(), doc));
        Ok(Some(id))
    }

    fn all_documents(&self) -> Vec<CycleDocument> {
        let mut docs: Vec<CycleDocument> = self.archived().into_iter().map(|(_, d)| d).collect();
        docs.extend(self.current());
        docs
    }
}

#[async_trait]
impl CycleStore for InMemoryCycleStore {
    async fn initialize_cycle(&self) -> Result<CycleHandle, String> {
        self.take_current()?;
        let now = Utc::now();
        let handle = CycleHandle::new(new_cycle_id(now), now);
        *self.current.lock().map_err(|e| e.to_string())? = Some(CycleDocument::open(&handle));
        Ok(handle)
    }

    async fn save_action_outcome(
        &self,
        cycle: &CycleHandle,
        outcome: &ActionOutcome,
    ) -> Result<(), String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("cycle store unavailable".to_string());
        }
        let mut current = self.current.lock().map_err(|e| e.to_string())?;
        match current.as_mut() {
            Some(doc) if doc.cycle_id == cycle.id() => {
                doc.outcome = Some(outcome.clone());
                Ok(())
            }
            _ => Err(format!("cycle {} is not the current cycle", cycle.id())),
        }
    }

    async fn archive_current(&self) -> Result<Option<String>, String> {
        if self.fail_archive.load(Ordering::SeqCst) {
            return Err("archive unavailable".to_string());
        }
        self.take_current()
    }

    async fn posts_on(&self, date: NaiveDate) -> Result<u32, String> {
        Ok(self
            .all_documents()
            .iter()
            .filter(|d| d.is_post_on(date))
            .count() as u32)
    }

    async fn recent_outcomes(&self, limit: usize) -> Result<Vec<ActionOutcome>, String> {
        let mut outcomes: Vec<ActionOutcome> = self
            .all_documents()
            .into_iter()
            .filter_map(|d| d.outcome)
            .collect();
        outcomes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        outcomes.truncate(limit);
        Ok(outcomes)
    }
}

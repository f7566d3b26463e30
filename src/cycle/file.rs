//! 基于 JSON 文件的周期存储
//!
//! 目录结构：
//! - `<root>/current.json`：当前周期
//! - `<root>/archive/YYYY-MM-DD/<cycle_id>.json`：已归档周期

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::fs;

use super::{new_cycle_id, CycleDocument, CycleHandle, CycleStore};
use crate::actions::ActionOutcome;

#[derive(Debug, Clone)]
pub struct FileCycleStore {
    root: PathBuf,
}

impl FileCycleStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn current_path(&self) -> PathBuf {
        self.root.join("current.json")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    async fn read_doc(path: &Path) -> anyhow::Result<Option<CycleDocument>> {
        match fs::read_to_string(path).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_doc(path: &Path, doc: &CycleDocument) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // 先写临时文件再 rename，避免中途崩溃留下半个文档
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(doc)?).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// 把 current.json 移入归档目录；无当前周期时返回 None
    async fn move_current_to_archive(&self) -> anyhow::Result<Option<String>> {
        let current = self.current_path();
        let doc = match Self::read_doc(&current).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Ok(None),
            Err(e) => {
                // 损坏的当前周期原样归档到今天的目录，不能阻塞新周期
                tracing::warn!(error = %e, "current cycle unreadable, archiving raw file");
                let bucket = self
                    .archive_dir()
                    .join(Utc::now().format("%Y-%m-%d").to_string());
                fs::create_dir_all(&bucket).await?;
                let name = format!("unreadable-{}.json", uuid::Uuid::new_v4().simple());
                fs::rename(&current, bucket.join(name)).await?;
                return Ok(None);
            }
        };
        let target = self
            .archive_dir()
            .join(doc.bucket())
            .join(format!("{}.json", doc.cycle_id));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&current, &target).await?;
        tracing::info!(cycle_id = %doc.cycle_id, archive = %target.display(), "cycle archived");
        Ok(Some(doc.cycle_id))
    }

    async fn docs_in(dir: &Path) -> anyhow::Result<Vec<CycleDocument>> {
        let mut docs = Vec::new();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(docs),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_doc(&path).await {
                Ok(Some(doc)) => docs.push(doc),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cycle"),
            }
        }
        Ok(docs)
    }

    /// 归档日期目录名，倒序（最新在前）
    async fn buckets_desc(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut buckets = Vec::new();
        let mut entries = match fs::read_dir(self.archive_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(buckets),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                buckets.push(entry.path());
            }
        }
        buckets.sort();
        buckets.reverse();
        Ok(buckets)
    }
}

#[async_trait]
impl CycleStore for FileCycleStore {
    async fn initialize_cycle(&self) -> Result<CycleHandle, String> {
        self.move_current_to_archive()
            .await
            .map_err(|e| format!("archive previous cycle: {e}"))?;
        let now = Utc::now();
        let handle = CycleHandle::new(new_cycle_id(now), now);
        Self::write_doc(&self.current_path(), &CycleDocument::open(&handle))
            .await
            .map_err(|e| format!("create cycle: {e}"))?;
        tracing::info!(cycle_id = %handle.id(), "cycle initialized");
        Ok(handle)
    }

    async fn save_action_outcome(
        &self,
        cycle: &CycleHandle,
        outcome: &ActionOutcome,
    ) -> Result<(), String> {
        let path = self.current_path();
        let mut doc = Self::read_doc(&path)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("cycle {} is not the current cycle", cycle.id()))?;
        if doc.cycle_id != cycle.id() {
            return Err(format!("cycle {} is not the current cycle", cycle.id()));
        }
        doc.outcome = Some(outcome.clone());
        Self::write_doc(&path, &doc).await.map_err(|e| e.to_string())
    }

    async fn archive_current(&self) -> Result<Option<String>, String> {
        self.move_current_to_archive()
            .await
            .map_err(|e| e.to_string())
    }

    async fn posts_on(&self, date: NaiveDate) -> Result<u32, String> {
        let bucket = self.archive_dir().join(date.format("%Y-%m-%d").to_string());
        let mut docs = Self::docs_in(&bucket).await.map_err(|e| e.to_string())?;
        docs.extend(
            Self::read_doc(&self.current_path())
                .await
                .map_err(|e| e.to_string())?,
        );
        Ok(docs.iter().filter(|d| d.is_post_on(date)).count() as u32)
    }

    async fn recent_outcomes(&self, limit: usize) -> Result<Vec<ActionOutcome>, String> {
        let mut outcomes: Vec<ActionOutcome> = Self::read_doc(&self.current_path())
            .await
            .map_err(|e| e.to_string())?
            .and_then(|d| d.outcome)
            .into_iter()
            .collect();
        for bucket in self.buckets_desc().await.map_err(|e| e.to_string())? {
            if outcomes.len() >= limit {
                break;
            }
            let docs = Self::docs_in(&bucket).await.map_err(|e| e.to_string())?;
            outcomes.extend(docs.into_iter().filter_map(|d| d.outcome));
        }
        outcomes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        outcomes.truncate(limit);
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::OutcomeKind;

    fn post() -> ActionOutcome {
        let mut o = ActionOutcome::new(OutcomeKind::Post);
        o.content = Some("hello".into());
        o
    }

    #[tokio::test]
    async fn test_initialize_archives_previous_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCycleStore::new(dir.path());

        let first = store.initialize_cycle().await.unwrap();
        store.save_action_outcome(&first, &post()).await.unwrap();
        let second = store.initialize_cycle().await.unwrap();
        assert_ne!(first.id(), second.id());

        let bucket = first.started_at().format("%Y-%m-%d").to_string();
        let archived = store
            .archive_dir()
            .join(bucket)
            .join(format!("{}.json", first.id()));
        assert!(archived.exists());

        let current = FileCycleStore::read_doc(&store.current_path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.cycle_id, second.id());
        assert!(current.outcome.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_and_rejects_stale_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCycleStore::new(dir.path());
        let first = store.initialize_cycle().await.unwrap();
        store.save_action_outcome(&first, &post()).await.unwrap();
        store
            .save_action_outcome(&first, &ActionOutcome::wait("changed mind"))
            .await
            .unwrap();
        let doc = FileCycleStore::read_doc(&store.current_path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.outcome.unwrap().action, OutcomeKind::Wait);

        let _second = store.initialize_cycle().await.unwrap();
        assert!(store.save_action_outcome(&first, &post()).await.is_err());
    }

    #[tokio::test]
    async fn test_posts_on_and_recent_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCycleStore::new(dir.path());
        for _ in 0..2 {
            let c = store.initialize_cycle().await.unwrap();
            store.save_action_outcome(&c, &post()).await.unwrap();
        }
        let c = store.initialize_cycle().await.unwrap();
        store
            .save_action_outcome(&c, &ActionOutcome::wait("cap"))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        assert_eq!(store.posts_on(today).await.unwrap(), 2);
        let recent = store.recent_outcomes(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(store.recent_outcomes(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_current_without_new_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCycleStore::new(dir.path());
        assert_eq!(store.archive_current().await.unwrap(), None);
        let c = store.initialize_cycle().await.unwrap();
        assert_eq!(
            store.archive_current().await.unwrap().as_deref(),
            Some(c.id())
        );
        assert!(!store.current_path().exists());
    }
}

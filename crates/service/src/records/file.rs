use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::records::domain::Record;
use crate::records::repository::RecordRepository;
use crate::storage::json_file_store::JsonFileStore;

/// On-disk layout: `{ "entries": [ ... ] }`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EntriesFile {
    #[serde(default)]
    pub entries: Vec<Record>,
}

/// 文件存储：整个记录集以单个 JSON 文档持久化，每次变更整体重写
pub struct FileRecordRepository {
    store: JsonFileStore<EntriesFile>,
}

impl FileRecordRepository {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let store = JsonFileStore::open(path).await?;
        Ok(Self { store })
    }
}

fn sorted_matches(entries: &[Record], term: &str) -> Vec<Record> {
    let needle = term.to_lowercase();
    let mut out: Vec<Record> = entries.iter().filter(|r| r.matches(&needle)).cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    out
}

#[async_trait]
impl RecordRepository for FileRecordRepository {
    async fn insert_if_absent(&self, record: &Record) -> Result<bool, ServiceError> {
        if self.store.read(|doc| doc.entries.iter().any(|r| r.id == record.id)).await {
            return Ok(false);
        }
        self.store
            .update(|doc| {
                // re-check under the write lock
                if doc.entries.iter().any(|r| r.id == record.id) {
                    return Ok(false);
                }
                doc.entries.push(record.clone());
                Ok(true)
            })
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, ServiceError> {
        Ok(self.store.read(|doc| doc.entries.iter().find(|r| r.id == id).cloned()).await)
    }

    async fn page(&self, term: Option<&str>, offset: u64, limit: u64) -> Result<(Vec<Record>, u64), ServiceError> {
        let matched = self.store.read(|doc| sorted_matches(&doc.entries, term.unwrap_or(""))).await;
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Ok((items, total))
    }

    async fn search(&self, term: &str, limit: u64) -> Result<Vec<Record>, ServiceError> {
        let mut matched = self.store.read(|doc| sorted_matches(&doc.entries, term)).await;
        matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matched)
    }

    async fn all(&self) -> Result<Vec<Record>, ServiceError> {
        Ok(self.store.read(|doc| sorted_matches(&doc.entries, "")).await)
    }

    async fn update_note(&self, id: &str, note: &str) -> Result<bool, ServiceError> {
        if !self.store.read(|doc| doc.entries.iter().any(|r| r.id == id)).await {
            return Ok(false);
        }
        self.store
            .update(|doc| {
                Ok(match doc.entries.iter_mut().find(|r| r.id == id) {
                    Some(r) => {
                        r.note = note.to_string();
                        true
                    }
                    None => false,
                })
            })
            .await
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.store
            .update(|doc| {
                let before = doc.entries.len();
                doc.entries.retain(|r| !ids.contains(&r.id));
                Ok((before - doc.entries.len()) as u64)
            })
            .await
    }

    async fn clear(&self) -> Result<u64, ServiceError> {
        self.store
            .update(|doc| {
                let removed = doc.entries.len() as u64;
                doc.entries.clear();
                Ok(removed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn file_repository_persists_and_orders() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ids.json");
        let repo = FileRecordRepository::open(&path).await?;

        let mut old = Record::new("old", "alice");
        old.created_at = Utc::now() - Duration::minutes(5);
        assert!(repo.insert_if_absent(&old).await?);
        assert!(repo.insert_if_absent(&Record::new("new", "bob")).await?);
        assert!(!repo.insert_if_absent(&Record::new("old", "mallory")).await?);

        let (items, total) = repo.page(None, 0, 1).await?;
        assert_eq!(total, 2);
        assert_eq!(items[0].id, "new");

        let (items, total) = repo.page(Some("ali"), 0, 10).await?;
        assert_eq!(total, 1);
        assert_eq!(items[0].id, "old");

        assert!(repo.update_note("old", "flagged").await?);
        assert!(!repo.update_note("ghost", "x").await?);

        // reopen from disk
        let reopened = FileRecordRepository::open(&path).await?;
        let rec = reopened.get("old").await?.expect("persisted");
        assert_eq!(rec.added_by, "alice");
        assert_eq!(rec.note, "flagged");

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(raw["entries"].as_array().map(Vec::len), Some(2));

        assert_eq!(reopened.delete_many(&["old".into(), "ghost".into()]).await?, 1);
        assert_eq!(reopened.clear().await?, 1);
        assert!(reopened.all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn search_is_capped() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let repo = FileRecordRepository::open(dir.path().join("ids.json")).await?;
        for i in 0..5 {
            repo.insert_if_absent(&Record::new(format!("id-{i}"), "alice")).await?;
        }
        assert_eq!(repo.search("id-", 3).await?.len(), 3);
        assert_eq!(repo.search("", 500).await?.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn failed_persist_does_not_leak_into_reads() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ids.json");
        let repo = FileRecordRepository::open(&path).await?;

        std::fs::remove_file(&path)?;
        std::fs::create_dir(&path)?;
        std::fs::write(path.join("blocker"), "x")?;

        assert!(repo.insert_if_absent(&Record::new("GHOST", "alice")).await.is_err());
        assert!(repo.get("GHOST").await?.is_none());
        assert_eq!(repo.page(None, 0, 10).await?.1, 0);
        Ok(())
    }
}

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::access::AccessControl;
use crate::errors::ServiceError;
use crate::keys::KeyResolver;
use crate::records::domain::{ImportReport, ListQuery, Record, RecordPage, SubmitOutcome, MANUAL_MARKER, SEARCH_LIMIT};
use crate::records::repository::RecordRepository;
use crate::records::transfer;

/// Application service for identifier records.
/// Owns validation, API-key attribution and the master-key gate; storage is
/// delegated to the repository.
pub struct RecordService {
    repo: Arc<dyn RecordRepository>,
    keys: Arc<KeyResolver>,
    access: AccessControl,
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

impl RecordService {
    pub fn new(repo: Arc<dyn RecordRepository>, keys: Arc<KeyResolver>, access: AccessControl) -> Self {
        Self { repo, keys, access }
    }

    pub fn keys(&self) -> &Arc<KeyResolver> { &self.keys }

    /// Master-key check without performing an operation.
    pub fn check_master_key(&self, master_key: Option<&str>) -> Result<(), ServiceError> {
        self.access.authorize(master_key)
    }

    fn submitter(&self, api_key: &str) -> Result<String, ServiceError> {
        let api_key = required(api_key, "apiKey")?;
        self.keys
            .resolve(&api_key)
            .ok_or_else(|| ServiceError::Unauthorized("unknown api key".into()))
    }

    async fn insert(&self, record: Record) -> Result<SubmitOutcome, ServiceError> {
        if self.repo.insert_if_absent(&record).await? {
            return Ok(SubmitOutcome { record, inserted: true });
        }
        // id already present: report the stored row
        let existing = self.repo.get(&record.id).await?.unwrap_or(record);
        Ok(SubmitOutcome { record: existing, inserted: false })
    }

    /// Submit one id on behalf of the owner of `api_key`. Duplicates are a no-op.
    #[instrument(skip(self, api_key))]
    pub async fn submit(&self, id: &str, api_key: &str) -> Result<SubmitOutcome, ServiceError> {
        let id = required(id, "id")?;
        let added_by = self.submitter(api_key)?;
        let outcome = self.insert(Record::new(id, added_by)).await?;
        if outcome.inserted {
            info!(id = %outcome.record.id, added_by = %outcome.record.added_by, "id_submitted");
        }
        Ok(outcome)
    }

    /// Batch submit; blank ids are skipped. Returns the number of new rows.
    #[instrument(skip(self, ids, api_key), fields(count = ids.len()))]
    pub async fn submit_many(&self, ids: &[String], api_key: &str) -> Result<usize, ServiceError> {
        let added_by = self.submitter(api_key)?;
        let ids: Vec<&str> = ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
        if ids.is_empty() {
            return Err(ServiceError::validation("ids must contain at least one id"));
        }
        let mut inserted = 0;
        for id in ids {
            if self.insert(Record::new(id, added_by.clone())).await?.inserted {
                inserted += 1;
            }
        }
        info!(inserted, %added_by, "ids_submitted");
        Ok(inserted)
    }

    #[instrument(skip(self, master_key))]
    pub async fn add_manual(&self, id: &str, master_key: Option<&str>) -> Result<SubmitOutcome, ServiceError> {
        self.access.authorize(master_key)?;
        let id = required(id, "id")?;
        self.insert(Record::new(id, MANUAL_MARKER)).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<RecordPage, ServiceError> {
        let (offset, limit) = query.pagination.normalize();
        let (items, total) = self.repo.page(query.filter_term(), offset, limit).await?;
        Ok(RecordPage { items, total })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Record>, ServiceError> {
        self.repo.search(query.trim(), SEARCH_LIMIT).await
    }

    /// Bare ids, newest first.
    pub async fn list_ids(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.repo.all().await?.into_iter().map(|r| r.id).collect())
    }

    #[instrument(skip(self, note, master_key))]
    pub async fn update_note(&self, id: &str, note: &str, master_key: Option<&str>) -> Result<(), ServiceError> {
        self.access.authorize(master_key)?;
        let id = required(id, "id")?;
        if !self.repo.update_note(&id, note).await? {
            return Err(ServiceError::not_found("record"));
        }
        info!(%id, "note_updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str, master_key: Option<&str>) -> Result<u64, ServiceError> {
        self.access.authorize(master_key)?;
        let id = required(id, "id")?;
        self.delete_many(&[id], master_key).await
    }

    /// Ids that do not exist are ignored.
    #[instrument(skip(self, ids, master_key), fields(count = ids.len()))]
    pub async fn delete_many(&self, ids: &[String], master_key: Option<&str>) -> Result<u64, ServiceError> {
        self.access.authorize(master_key)?;
        let ids: Vec<String> = ids.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        let deleted = self.repo.delete_many(&ids).await?;
        info!(requested = ids.len(), deleted, "ids_deleted");
        Ok(deleted)
    }

    #[instrument(skip(self, master_key))]
    pub async fn clear_all(&self, master_key: Option<&str>) -> Result<u64, ServiceError> {
        self.access.authorize(master_key)?;
        let deleted = self.repo.clear().await?;
        warn!(deleted, "all_ids_cleared");
        Ok(deleted)
    }

    pub async fn export(&self, master_key: Option<&str>) -> Result<Vec<Record>, ServiceError> {
        self.access.authorize(master_key)?;
        self.repo.all().await
    }

    /// Best-effort import: rows are inserted one by one and earlier rows stay
    /// when a later one fails.
    #[instrument(skip(self, bytes, master_key), fields(size = bytes.len()))]
    pub async fn import(&self, bytes: &[u8], master_key: Option<&str>) -> Result<ImportReport, ServiceError> {
        self.access.authorize(master_key)?;
        let parsed = transfer::parse_import(bytes, Utc::now())?;
        let mut report = ImportReport { imported: 0, skipped: parsed.skipped };
        for record in parsed.records {
            if self.repo.insert_if_absent(&record).await? {
                report.imported += 1;
            } else {
                report.skipped += 1;
            }
        }
        info!(imported = report.imported, skipped = report.skipped, "ids_imported");
        Ok(report)
    }

    pub fn reload_keys(&self, master_key: Option<&str>) -> Result<usize, ServiceError> {
        self.access.authorize(master_key)?;
        self.keys.reload()
    }
}

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::records::domain::Record;

/// Storage seam for identifier records. Implementations order every listing
/// newest first (ties by id) and treat `term` as a lowercase substring
/// matched against id, added_by and note.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert unless the id exists; returns whether a row was written.
    async fn insert_if_absent(&self, record: &Record) -> Result<bool, ServiceError>;
    async fn get(&self, id: &str) -> Result<Option<Record>, ServiceError>;
    /// One page plus the total number of matching rows. `term` is matched
    /// case-insensitively; implementations do their own case folding.
    async fn page(&self, term: Option<&str>, offset: u64, limit: u64) -> Result<(Vec<Record>, u64), ServiceError>;
    async fn search(&self, term: &str, limit: u64) -> Result<Vec<Record>, ServiceError>;
    async fn all(&self) -> Result<Vec<Record>, ServiceError>;
    /// Returns false when no record has `id`.
    async fn update_note(&self, id: &str, note: &str) -> Result<bool, ServiceError>;
    async fn delete_many(&self, ids: &[String]) -> Result<u64, ServiceError>;
    async fn clear(&self) -> Result<u64, ServiceError>;
}

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use models::record;

use crate::errors::ServiceError;
use crate::records::domain::Record;
use crate::records::repository::RecordRepository;

/// SeaORM-backed repository over the `ids` table.
pub struct SeaOrmRecordRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmRecordRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn into_records(rows: Vec<record::Model>) -> Vec<Record> {
    rows.into_iter().map(Record::from).collect()
}

#[async_trait]
impl RecordRepository for SeaOrmRecordRepository {
    async fn insert_if_absent(&self, r: &Record) -> Result<bool, ServiceError> {
        Ok(record::insert_if_absent(&self.db, &r.id, &r.added_by, &r.note, r.created_at.fixed_offset()).await?)
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, ServiceError> {
        Ok(record::find(&self.db, id).await?.map(Record::from))
    }

    async fn page(&self, term: Option<&str>, offset: u64, limit: u64) -> Result<(Vec<Record>, u64), ServiceError> {
        let (rows, total) = record::page(&self.db, term, offset, limit).await?;
        Ok((into_records(rows), total))
    }

    async fn search(&self, term: &str, limit: u64) -> Result<Vec<Record>, ServiceError> {
        Ok(into_records(record::search(&self.db, term, limit).await?))
    }

    async fn all(&self) -> Result<Vec<Record>, ServiceError> {
        Ok(into_records(record::all(&self.db).await?))
    }

    async fn update_note(&self, id: &str, note: &str) -> Result<bool, ServiceError> {
        Ok(record::update_note(&self.db, id, note).await?)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, ServiceError> {
        Ok(record::delete_many(&self.db, ids).await?)
    }

    async fn clear(&self) -> Result<u64, ServiceError> {
        Ok(record::delete_all(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn seaorm_repository_roundtrip() -> Result<(), anyhow::Error> {
        let repo = SeaOrmRecordRepository::new(get_db().await?);
        let mut first = Record::new("ABC123", "alice");
        first.created_at = Utc::now() - Duration::seconds(10);
        let second = Record::new("XYZ", "bob");

        assert!(repo.insert_if_absent(&first).await?);
        assert!(repo.insert_if_absent(&second).await?);
        assert!(!repo.insert_if_absent(&Record::new("ABC123", "mallory")).await?);

        let (items, total) = repo.page(None, 0, 10).await?;
        assert_eq!(total, 2);
        assert_eq!(items[0].id, "XYZ");
        assert_eq!(items[1].added_by, "alice");

        let found = repo.search("lice", 500).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "ABC123");

        assert!(repo.update_note("ABC123", "flagged").await?);
        assert_eq!(repo.get("ABC123").await?.map(|r| r.note).as_deref(), Some("flagged"));

        assert_eq!(repo.delete_many(&["ABC123".into(), "nope".into()]).await?, 1);
        assert_eq!(repo.clear().await?, 1);
        assert!(repo.all().await?.is_empty());
        Ok(())
    }
}

//! Migrator for the `ids` table.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_ids;
mod m20240101_000002_add_indexes;
mod m20240101_000003_normalize_legacy_ids;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_ids::Migration),
            Box::new(m20240101_000002_add_indexes::Migration),
            // tables left behind by the earlier deployment (nullable columns, naive timestamps)
            Box::new(m20240101_000003_normalize_legacy_ids::Migration),
        ]
    }
}

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

/// Brings an `ids` table created by the earlier deployment in line with the
/// entity: NULL `added_by`/`note`/`created_at` are backfilled and, on
/// PostgreSQL, `created_at TIMESTAMP` becomes `TIMESTAMPTZ` read as UTC.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("UPDATE ids SET added_by = '' WHERE added_by IS NULL").await?;
        db.execute_unprepared("UPDATE ids SET note = '' WHERE note IS NULL").await?;

        match manager.get_database_backend() {
            DatabaseBackend::Postgres => {
                let row = db
                    .query_one(Statement::from_string(
                        DatabaseBackend::Postgres,
                        "SELECT data_type FROM information_schema.columns \
                         WHERE table_schema = current_schema() AND table_name = 'ids' AND column_name = 'created_at'"
                            .to_string(),
                    ))
                    .await?;
                let data_type: String = match row {
                    Some(r) => r.try_get("", "data_type")?,
                    None => return Err(DbErr::Custom("ids.created_at column is missing".into())),
                };
                db.execute_unprepared("UPDATE ids SET created_at = NOW() WHERE created_at IS NULL").await?;
                if data_type == "timestamp without time zone" {
                    db.execute_unprepared(
                        "ALTER TABLE ids ALTER COLUMN created_at TYPE TIMESTAMPTZ USING created_at AT TIME ZONE 'UTC'",
                    )
                    .await?;
                }
                db.execute_unprepared(
                    "ALTER TABLE ids \
                     ALTER COLUMN created_at SET DEFAULT CURRENT_TIMESTAMP, \
                     ALTER COLUMN created_at SET NOT NULL, \
                     ALTER COLUMN added_by SET NOT NULL, \
                     ALTER COLUMN note SET DEFAULT '', \
                     ALTER COLUMN note SET NOT NULL",
                )
                .await?;
            }
            DatabaseBackend::Sqlite => {
                // naive text timestamps gain an explicit UTC offset
                db.execute_unprepared(
                    "UPDATE ids SET created_at = strftime('%Y-%m-%d %H:%M:%f', COALESCE(created_at, CURRENT_TIMESTAMP)) || '+00:00' \
                     WHERE created_at IS NULL OR (instr(created_at, '+') = 0 AND substr(created_at, -1) <> 'Z')",
                )
                .await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        Ok(())
    }
}

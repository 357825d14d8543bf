use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ids: listing is always newest first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ids_created_at")
                    .table(Ids::Table)
                    .col(Ids::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_ids_created_at").table(Ids::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Ids { Table, CreatedAt }

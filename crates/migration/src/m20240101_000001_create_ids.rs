use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ids::Table)
                    .if_not_exists()
                    .col(text(Ids::Id).primary_key())
                    .col(text(Ids::AddedBy))
                    .col(text(Ids::Note).default(""))
                    .col(timestamp_with_time_zone(Ids::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Ids::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Ids { Table, Id, AddedBy, Note, CreatedAt }

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict};
use sea_orm::{Condition, ConnectionTrait, DatabaseBackend, DatabaseConnection, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Rows of the `ids` table: one submitted identifier with attribution.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub added_by: String,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert unless a row with the same id exists. Returns whether a row was written.
pub async fn insert_if_absent(
    db: &DatabaseConnection,
    id: &str,
    added_by: &str,
    note: &str,
    created_at: DateTimeWithTimeZone,
) -> Result<bool, ModelError> {
    if id.trim().is_empty() { return Err(ModelError::Validation("id required".into())); }
    let am = ActiveModel {
        id: Set(id.to_string()),
        added_by: Set(added_by.to_string()),
        note: Set(note.to_string()),
        created_at: Set(created_at),
    };
    let rows = Entity::insert(am)
        .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    Ok(rows > 0)
}

pub async fn find(db: &DatabaseConnection, id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id.to_string()).one(db).await?)
}

/// Newest first; `term` filters case-insensitively on id, added_by and note.
pub async fn page(
    db: &DatabaseConnection,
    term: Option<&str>,
    offset: u64,
    limit: u64,
) -> Result<(Vec<Model>, u64), ModelError> {
    let mut select = Entity::find();
    if let Some(term) = term.filter(|t| !t.is_empty()) {
        select = select.filter(matches_term(db.get_database_backend(), term));
    }
    let total = select.clone().count(db).await?;
    let rows = newest_first(select).offset(offset).limit(limit).all(db).await?;
    Ok((rows, total))
}

pub async fn search(db: &DatabaseConnection, term: &str, limit: u64) -> Result<Vec<Model>, ModelError> {
    let mut select = Entity::find();
    if !term.is_empty() {
        select = select.filter(matches_term(db.get_database_backend(), term));
    }
    Ok(newest_first(select).limit(limit).all(db).await?)
}

pub async fn all(db: &DatabaseConnection) -> Result<Vec<Model>, ModelError> {
    Ok(newest_first(Entity::find()).all(db).await?)
}

pub async fn update_note(db: &DatabaseConnection, id: &str, note: &str) -> Result<bool, ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::Note, Expr::value(note.to_string()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

pub async fn delete_many(db: &DatabaseConnection, ids: &[String]) -> Result<u64, ModelError> {
    if ids.is_empty() { return Ok(0); }
    let res = Entity::delete_many()
        .filter(Column::Id.is_in(ids.iter().cloned()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete_all(db: &DatabaseConnection) -> Result<u64, ModelError> {
    Ok(Entity::delete_many().exec(db).await?.rows_affected)
}

fn newest_first(select: Select<Entity>) -> Select<Entity> {
    select.order_by_desc(Column::CreatedAt).order_by_asc(Column::Id)
}

/// `lower()` folds ASCII only on SQLite, so the needle is folded the same way
/// there; non-ASCII letters then match only in the case they were typed.
fn matches_term(backend: DatabaseBackend, term: &str) -> Condition {
    let folded = match backend {
        DatabaseBackend::Sqlite => term.to_ascii_lowercase(),
        _ => term.to_lowercase(),
    };
    let pattern = format!("%{}%", escape_like(&folded));
    [Column::Id, Column::AddedBy, Column::Note]
        .into_iter()
        .fold(Condition::any(), |cond, col| {
            cond.add(Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern.clone()).escape('\\')))
        })
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') { out.push('\\'); }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}

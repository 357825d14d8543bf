use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Query, State},
    http::request::Parts,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::types::Ack;

use crate::errors::JsonApiError;
use crate::state::AppState;

/// Master key taken from the query string (`masterKey`) or the `x-master-key`
/// header. A key in the JSON body wins over both; see [`SuppliedMasterKey::or_body`].
#[derive(Debug, Default)]
pub struct SuppliedMasterKey(pub Option<String>);

#[derive(Deserialize)]
struct MasterKeyQuery {
    #[serde(rename = "masterKey")]
    master_key: Option<String>,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SuppliedMasterKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_query = Query::<MasterKeyQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.master_key);
        let from_header = parts
            .headers
            .get("x-master-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Self(from_query.or(from_header)))
    }
}

impl SuppliedMasterKey {
    pub fn or_body(self, body: Option<String>) -> Option<String> {
        body.or(self.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdInput {
    #[serde(default)]
    pub id: String,
    pub master_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub note: String,
    pub master_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsInput {
    #[serde(default)]
    pub ids: Vec<String>,
    pub master_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterKeyInput {
    pub master_key: Option<String>,
}

#[utoipa::path(post, path = "/api/add-manual", tag = "admin", request_body = crate::openapi::IdInputDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key")))]
pub async fn add_manual(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    payload: Result<Json<IdInput>, JsonRejection>,
) -> Result<Json<Value>, JsonApiError> {
    let Json(input) = payload?;
    let master_key = supplied.or_body(input.master_key);
    let outcome = state.records.add_manual(&input.id, master_key.as_deref()).await?;
    Ok(Json(json!({ "success": true, "inserted": outcome.inserted, "record": outcome.record })))
}

/// 修改备注；记录不存在时返回 404
#[utoipa::path(post, path = "/api/note", tag = "admin", request_body = crate::openapi::NoteInputDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key"), (status = 404, description = "No such id")))]
pub async fn update_note(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> Result<Json<Ack>, JsonApiError> {
    let Json(input) = payload?;
    let master_key = supplied.or_body(input.master_key);
    state.records.update_note(&input.id, &input.note, master_key.as_deref()).await?;
    Ok(Json(Ack::ok()))
}

#[utoipa::path(post, path = "/api/delete", tag = "admin", request_body = crate::openapi::IdInputDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key")))]
pub async fn delete_one(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    payload: Result<Json<IdInput>, JsonRejection>,
) -> Result<Json<Value>, JsonApiError> {
    let Json(input) = payload?;
    let master_key = supplied.or_body(input.master_key);
    let deleted = state.records.delete(&input.id, master_key.as_deref()).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// 批量删除，不存在的 ID 忽略
#[utoipa::path(post, path = "/api/delete-multiple", tag = "admin", request_body = crate::openapi::IdsInputDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key")))]
pub async fn delete_multiple(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    payload: Result<Json<IdsInput>, JsonRejection>,
) -> Result<Json<Value>, JsonApiError> {
    let Json(input) = payload?;
    let master_key = supplied.or_body(input.master_key);
    let deleted = state.records.delete_many(&input.ids, master_key.as_deref()).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

#[utoipa::path(post, path = "/api/clear-all", tag = "admin", request_body = crate::openapi::MasterKeyDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key")))]
pub async fn clear_all(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    body: Option<Json<MasterKeyInput>>,
) -> Result<Json<Value>, JsonApiError> {
    let master_key = supplied.or_body(body.and_then(|Json(b)| b.master_key));
    let deleted = state.records.clear_all(master_key.as_deref()).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// 重新读取 API Key 注册表
#[utoipa::path(post, path = "/api/reload-keys", tag = "admin", request_body = crate::openapi::MasterKeyDoc, responses((status = 200, description = "OK"), (status = 403, description = "Invalid master key"), (status = 404, description = "Key file missing")))]
pub async fn reload_keys(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    body: Option<Json<MasterKeyInput>>,
) -> Result<Json<Value>, JsonApiError> {
    let master_key = supplied.or_body(body.and_then(|Json(b)| b.master_key));
    let keys = state.records.reload_keys(master_key.as_deref())?;
    Ok(Json(json!({ "success": true, "keys": keys })))
}

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use common::pagination::Pagination;
use service::records::{ListQuery, Record, RecordPage};

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page index
    pub page: Option<u32>,
    /// page size, clamped to 1..=500
    pub limit: Option<u32>,
    /// case-insensitive substring of id, added_by or note
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ItemsOutput {
    pub items: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddIdInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// 分页列出记录（按 created_at 倒序）
#[utoipa::path(get, path = "/api/list-full", tag = "records", params(ListParams), responses((status = 200, description = "One page of records", body = crate::openapi::RecordPageDoc)))]
pub async fn list_full(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecordPage>, JsonApiError> {
    let query = ListQuery {
        pagination: Pagination::new(params.page, params.limit),
        filter: params.filter,
    };
    Ok(Json(state.records.list(&query).await?))
}

/// 全量搜索，最多返回 500 条
#[utoipa::path(get, path = "/api/search", tag = "records", params(SearchParams), responses((status = 200, description = "Matching records", body = crate::openapi::ItemsDoc)))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ItemsOutput>, JsonApiError> {
    let items = state.records.search(&params.query).await?;
    Ok(Json(ItemsOutput { items }))
}

/// 浏览器扩展高亮用的纯 ID 列表
#[utoipa::path(get, path = "/api/highlight-list", tag = "records", responses((status = 200, description = "Bare id list")))]
pub async fn highlight_list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, JsonApiError> {
    let ids = state.records.list_ids().await?;
    Ok(Json(json!({ "ids": ids })))
}

/// 通过 API Key 提交一个或多个 ID；重复 ID 忽略
#[utoipa::path(post, path = "/api/add-id", tag = "records", request_body = crate::openapi::AddIdDoc, responses((status = 200, description = "Accepted"), (status = 400, description = "Missing id or apiKey"), (status = 403, description = "Unknown apiKey")))]
pub async fn add_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AddIdInput>, JsonRejection>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    let Json(input) = payload?;
    // body 优先，其次 x-api-key 头
    let api_key = input
        .api_key
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(str::to_string))
        .unwrap_or_default();

    // 空的 ids 数组退回到单个 id
    let ids = input.ids.filter(|ids| !ids.is_empty());
    let inserted = match (ids, input.id) {
        (Some(ids), _) => state.records.submit_many(&ids, &api_key).await?,
        (None, id) => usize::from(state.records.submit(id.as_deref().unwrap_or(""), &api_key).await?.inserted),
    };
    Ok(Json(json!({ "success": true, "inserted": inserted })))
}

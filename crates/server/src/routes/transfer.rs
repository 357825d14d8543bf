use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::debug;

use service::records::transfer::{encode_export, EXPORT_FILE_NAME};

use crate::errors::JsonApiError;
use crate::routes::admin::SuppliedMasterKey;
use crate::state::AppState;

/// 全量导出为 JSON 附件
#[utoipa::path(get, path = "/api/export", tag = "transfer", params(("masterKey" = String, Query, description = "Master key")), responses((status = 200, description = "ids_export.json attachment"), (status = 403, description = "Invalid master key")))]
pub async fn export(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
) -> Result<impl IntoResponse, JsonApiError> {
    let records = state.records.export(supplied.0.as_deref()).await?;
    let body = encode_export(&records)?;
    let disposition = format!("attachment; filename={EXPORT_FILE_NAME}");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// multipart 上传：`file` 为导出格式的 JSON，`masterKey` 可放在表单、查询串或请求头
#[utoipa::path(post, path = "/api/import", tag = "transfer", responses((status = 200, description = "Import summary"), (status = 400, description = "Missing or malformed file"), (status = 403, description = "Invalid master key")))]
pub async fn import(
    State(state): State<AppState>,
    supplied: SuppliedMasterKey,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    let mut multipart = multipart?;
    let mut file: Option<Vec<u8>> = None;
    let mut form_key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| JsonApiError::bad_request(format!("failed to read file: {e}")))?;
                file = Some(bytes.to_vec());
            }
            Some("masterKey") => {
                let key = field
                    .text()
                    .await
                    .map_err(|e| JsonApiError::bad_request(format!("failed to read masterKey: {e}")))?;
                form_key = Some(key);
            }
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }

    let master_key = supplied.or_body(form_key);
    let Some(bytes) = file else {
        state.records.check_master_key(master_key.as_deref())?;
        return Err(JsonApiError::bad_request("file is required"));
    };
    let report = state.records.import(&bytes, master_key.as_deref()).await?;
    Ok(Json(json!({ "success": true, "imported": report.imported, "skipped": report.skipped })))
}

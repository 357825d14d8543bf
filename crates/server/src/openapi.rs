use serde::Deserialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RecordDoc {
    pub id: String,
    pub added_by: String,
    pub note: String,
    /// RFC 3339
    pub created_at: String,
}

#[derive(ToSchema)]
pub struct RecordPageDoc { pub items: Vec<RecordDoc>, pub total: u64 }

#[derive(ToSchema)]
pub struct ItemsDoc { pub items: Vec<RecordDoc> }

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddIdDoc { pub id: Option<String>, pub ids: Option<Vec<String>>, pub api_key: Option<String> }

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdInputDoc { pub id: String, pub master_key: Option<String> }

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteInputDoc { pub id: String, pub note: String, pub master_key: Option<String> }

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdsInputDoc { pub ids: Vec<String>, pub master_key: Option<String> }

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MasterKeyDoc { pub master_key: Option<String> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::records::list_full,
        crate::routes::records::search,
        crate::routes::records::highlight_list,
        crate::routes::records::add_id,
        crate::routes::admin::add_manual,
        crate::routes::admin::update_note,
        crate::routes::admin::delete_one,
        crate::routes::admin::delete_multiple,
        crate::routes::admin::clear_all,
        crate::routes::admin::reload_keys,
        crate::routes::transfer::export,
        crate::routes::transfer::import,
    ),
    components(
        schemas(
            HealthResponse,
            RecordDoc,
            RecordPageDoc,
            ItemsDoc,
            AddIdDoc,
            IdInputDoc,
            NoteInputDoc,
            IdsInputDoc,
            MasterKeyDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "records"),
        (name = "admin"),
        (name = "transfer")
    )
)]
pub struct ApiDoc;

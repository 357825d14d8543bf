use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod records;
pub mod admin;
pub mod transfer;

const IMPORT_BODY_LIMIT: usize = 16 * 1024 * 1024;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: JSON API, health, OpenAPI document and
/// the static admin page served from `frontend_dir`.
pub fn build_router(state: AppState, cors: CorsLayer, frontend_dir: &str) -> Router {
    let static_dir = ServeDir::new(frontend_dir)
        .fallback(ServeFile::new(format!("{frontend_dir}/index.html")));

    // Public read and submission routes
    let public = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/api/list-full", get(records::list_full))
        .route("/api/search", get(records::search))
        .route("/api/highlight-list", get(records::highlight_list))
        .route("/api/add-id", post(records::add_id));

    // Master-key gated routes
    let admin_routes = Router::new()
        .route("/api/add-manual", post(admin::add_manual))
        .route("/api/note", post(admin::update_note))
        .route("/api/update-note", post(admin::update_note))
        .route("/api/delete", post(admin::delete_one))
        .route("/api/delete-multiple", post(admin::delete_multiple))
        .route("/api/clear-all", post(admin::clear_all))
        .route("/api/clear", post(admin::clear_all))
        .route("/api/reload-keys", post(admin::reload_keys))
        .route("/api/export", get(transfer::export))
        .route(
            "/api/import",
            post(transfer::import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        );

    public
        .merge(admin_routes)
        .fallback_service(static_dir)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // span 只记录路径：查询串可能携带 masterKey
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!("request", method = %req.method(), path = %req.uri().path())
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use configs::{AppConfig, StorageBackend};
use migration::{Migrator, MigratorTrait};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::{
    access::AccessControl,
    keys::KeyResolver,
    records::{
        file::FileRecordRepository, seaorm::SeaOrmRecordRepository, RecordRepository, RecordService,
    },
};

use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire the storage backend, key registry and master-key gate from config.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let keys = Arc::new(KeyResolver::load(&cfg.keys).context("loading key registry")?);
    if keys.is_empty() {
        warn!("key registry is empty; /api/add-id will refuse every submission");
    }
    if let Some(every) = cfg.keys.reload_interval() {
        info!(interval_secs = every.as_secs(), "polling key registry for changes");
        Arc::clone(&keys).spawn_polling(every);
    }

    let access = AccessControl::new(cfg.auth.master_key.clone());
    if !access.is_configured() {
        warn!("MASTER_KEY is empty; administrative endpoints are disabled");
    }

    let repo: Arc<dyn RecordRepository> = match cfg.storage.backend {
        StorageBackend::Database => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            // 启动时自动执行迁移
            Migrator::up(&db, None).await.context("running migrations")?;
            Arc::new(SeaOrmRecordRepository::new(db))
        }
        StorageBackend::File => {
            let path = &cfg.storage.file_path;
            info!(path = %path.display(), "using JSON file storage");
            Arc::new(FileRecordRepository::open(path.clone()).await?)
        }
    };

    Ok(AppState::new(RecordService::new(repo, keys, access)))
}

/// Full application router for `cfg`.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(cfg).await?;
    Ok(routes::build_router(state, build_cors(), &cfg.server.frontend_dir))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    // 仅文件存储需要数据目录
    let data_file = matches!(cfg.storage.backend, StorageBackend::File)
        .then_some(cfg.storage.file_path.as_path());
    common::env::ensure_env(&cfg.server.frontend_dir, data_file).await?;

    let app = build_app(&cfg).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cfg.server.host, cfg.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = ?cfg.storage.backend, "id registry listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

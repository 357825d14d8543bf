use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

use configs::DatabaseConfig;

/// Open a pooled connection using the validated database section.
pub async fn connect_with_config(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(cfg.url.clone());
    let (min, max) = if is_sqlite_memory(&cfg.url) {
        // every pooled connection would otherwise open its own empty database
        (1, 1)
    } else {
        (cfg.min_connections, cfg.max_connections)
    };
    opts.max_connections(max)
        .min_connections(min)
        .connect_timeout(cfg.connect_timeout())
        .acquire_timeout(cfg.acquire_timeout())
        .sqlx_logging(cfg.sqlx_logging);
    let db = Database::connect(opts).await?;
    info!(backend = ?db.get_database_backend(), max_connections = max, "database connected");
    Ok(db)
}

fn is_sqlite_memory(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("sqlite:") && lower.contains(":memory:")
}

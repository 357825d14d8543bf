use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: None, frontend_dir: default_frontend_dir() }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 10000 }
fn default_frontend_dir() -> String { "frontend".into() }

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Database,
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "file" | "json" => Ok(Self::File),
            other => Err(anyhow!("unknown storage backend `{other}` (expected database|file)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self { Self { backend: StorageBackend::default(), file_path: default_file_path() } }
}

fn default_file_path() -> PathBuf { PathBuf::from("data/ids.json") }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 30 }
fn default_acquire_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub master_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_keys_path")]
    pub path: PathBuf,
    /// Inline registry JSON; populated from `API_KEYS`, takes precedence over `path`.
    #[serde(default)]
    pub inline: Option<String>,
    /// Accept unregistered API keys and attribute records to the raw key.
    #[serde(default)]
    pub accept_unknown: bool,
    /// 0 disables polling of the key file.
    #[serde(default)]
    pub reload_interval_secs: u64,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self { path: default_keys_path(), inline: None, accept_unknown: false, reload_interval_secs: 0 }
    }
}

fn default_keys_path() -> PathBuf { PathBuf::from("keys.json") }

impl KeysConfig {
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }
}

/// Load from `CONFIG_PATH` (default `config.toml`), overlay the process
/// environment and validate. A missing file is not an error.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut cfg = if Path::new(&path).exists() { load_from_file(&path)? } else { AppConfig::default() };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.normalize_and_validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let cfg: AppConfig = toml::from_str(&content).with_context(|| format!("parsing {path}"))?;
    Ok(cfg)
}

impl AppConfig {
    /// Overlay environment variables; `lookup` abstracts `std::env::var` for tests.
    /// A variable that is set but does not parse is an error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("SERVER_HOST") {
            self.server.host = host;
        }
        let port = non_empty("PORT")
            .map(|v| ("PORT", v))
            .or_else(|| non_empty("SERVER_PORT").map(|v| ("SERVER_PORT", v)));
        if let Some((key, raw)) = port {
            self.server.port = raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{key}={raw} is not a valid port"))?;
        }
        if let Some(raw) = non_empty("TOKIO_WORKER_THREADS") {
            let threads = raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("TOKIO_WORKER_THREADS={raw} is not a thread count"))?;
            self.server.worker_threads = Some(threads);
        }
        if let Some(raw) = non_empty("STORAGE_BACKEND") {
            self.storage.backend = raw.parse().context("STORAGE_BACKEND")?;
        }
        if let Some(path) = non_empty("STORAGE_FILE") {
            self.storage.file_path = PathBuf::from(path);
        }
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        if self.database.url.trim().is_empty() {
            if let Some(url) = non_empty("DATABASE_URL") {
                self.database.url = url;
            }
        }
        if let Some(key) = non_empty("MASTER_KEY") {
            self.auth.master_key = key;
        }
        if let Some(path) = non_empty("KEYS_PATH") {
            self.keys.path = PathBuf::from(path);
        }
        if let Some(inline) = non_empty("API_KEYS") {
            self.keys.inline = Some(inline);
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        if self.storage.backend == StorageBackend::Database {
            self.database.validate()?;
        } else if self.storage.file_path.as_os_str().is_empty() {
            return Err(anyhow!("storage.file_path must not be empty for the file backend"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads == Some(0) {
            self.worker_threads = None;
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }

    pub fn acquire_timeout(&self) -> Duration { Duration::from_secs(self.acquire_timeout_secs) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 10000);
        assert_eq!(cfg.storage.backend, StorageBackend::Database);
        assert_eq!(cfg.keys.path, PathBuf::from("keys.json"));
        assert!(cfg.keys.reload_interval().is_none());
    }

    #[test]
    fn env_overrides_are_applied() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.apply_env(env(&[
            ("PORT", "8088"),
            ("DATABASE_URL", "postgres://u:p@localhost/ids"),
            ("MASTER_KEY", "secret"),
            ("API_KEYS", r#"{"keys":[]}"#),
            ("STORAGE_BACKEND", "file"),
        ]))?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.auth.master_key, "secret");
        assert_eq!(cfg.storage.backend, StorageBackend::File);
        assert_eq!(cfg.keys.inline.as_deref(), Some(r#"{"keys":[]}"#));
        Ok(())
    }

    #[test]
    fn malformed_env_values_are_rejected() {
        for (key, value) in [
            ("STORAGE_BACKEND", "files"),
            ("PORT", "80a"),
            ("SERVER_PORT", "70000"),
            ("TOKIO_WORKER_THREADS", "many"),
        ] {
            let mut cfg = AppConfig::default();
            let err = cfg.apply_env(env(&[(key, value)])).expect_err(key);
            assert!(format!("{err:#}").contains(key), "{key}: {err:#}");
        }

        // blank values are treated as unset
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env(env(&[("PORT", "  ")])).is_ok());
        assert_eq!(cfg.server.port, 10000);
    }

    #[test]
    fn toml_url_wins_over_env() -> Result<()> {
        let mut cfg: AppConfig = toml::from_str(
            r#"
            [database]
            url = "sqlite::memory:"
            "#,
        )?;
        cfg.apply_env(env(&[("DATABASE_URL", "postgres://elsewhere/db")]))?;
        assert_eq!(cfg.database.url, "sqlite::memory:");
        Ok(())
    }

    #[test]
    fn database_backend_requires_url() {
        let mut cfg = AppConfig::default();
        assert!(cfg.normalize_and_validate().is_err());

        cfg.database.url = "mysql://nope".into();
        assert!(cfg.normalize_and_validate().is_err());

        cfg.database.url = "postgresql://localhost/ids".into();
        assert!(cfg.normalize_and_validate().is_ok());
    }

    #[test]
    fn file_backend_skips_database_validation() -> Result<()> {
        let mut cfg: AppConfig = toml::from_str(
            r#"
            [storage]
            backend = "file"
            file_path = "var/ids.json"

            [keys]
            accept_unknown = true
            reload_interval_secs = 5
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.storage.file_path, PathBuf::from("var/ids.json"));
        assert!(cfg.keys.accept_unknown);
        assert_eq!(cfg.keys.reload_interval(), Some(Duration::from_secs(5)));
        Ok(())
    }

    #[test]
    fn load_from_file_reports_parse_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n")?;
        assert!(load_from_file(path.to_str().unwrap_or_default()).is_err());
        Ok(())
    }
}

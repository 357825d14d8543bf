//! API key registry: maps submitter keys to display names.
//!
//! The registry is loaded once at startup from inline JSON (`API_KEYS`) or a
//! JSON file. Reloads swap the whole map atomically; readers never block.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use configs::KeysConfig;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: String,
    pub user: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryDoc {
    Wrapped { keys: Vec<KeyEntry> },
    Bare(Vec<KeyEntry>),
}

#[derive(Debug, Clone)]
enum KeySource {
    Inline(String),
    File(PathBuf),
    Static,
}

pub struct KeyResolver {
    source: KeySource,
    map: ArcSwap<HashMap<String, String>>,
    accept_unknown: bool,
    last_modified: Mutex<Option<SystemTime>>,
}

impl KeyResolver {
    /// Build from configuration. A missing key file yields an empty registry;
    /// malformed JSON is an error.
    pub fn load(cfg: &KeysConfig) -> Result<Self, ServiceError> {
        let (source, map, mtime) = match cfg.inline.as_deref() {
            Some(inline) => (KeySource::Inline(inline.to_string()), parse_registry(inline.as_bytes())?, None),
            None => {
                let path = cfg.path.clone();
                match std::fs::read(&path) {
                    Ok(bytes) => {
                        let map = parse_registry(&bytes)?;
                        (KeySource::File(path.clone()), map, modified(&path))
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        warn!(path = %path.display(), "key registry file not found; submissions will be refused");
                        (KeySource::File(path), HashMap::new(), None)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };
        info!(keys = map.len(), source = source.label(), "key registry loaded");
        Ok(Self {
            source,
            map: ArcSwap::from_pointee(map),
            accept_unknown: cfg.accept_unknown,
            last_modified: Mutex::new(mtime),
        })
    }

    /// Fixed registry without a reload source.
    pub fn from_pairs<I, K, U>(pairs: I, accept_unknown: bool) -> Self
    where
        I: IntoIterator<Item = (K, U)>,
        K: Into<String>,
        U: Into<String>,
    {
        let map = pairs.into_iter().map(|(k, u)| (k.into(), u.into())).collect();
        Self {
            source: KeySource::Static,
            map: ArcSwap::from_pointee(map),
            accept_unknown,
            last_modified: Mutex::new(None),
        }
    }

    /// Display name for `key`; unknown keys resolve to themselves only when
    /// passthrough is enabled.
    pub fn resolve(&self, key: &str) -> Option<String> {
        match self.map.load().get(key) {
            Some(user) => Some(user.clone()),
            None if self.accept_unknown => Some(key.to_string()),
            None => None,
        }
    }

    pub fn len(&self) -> usize { self.map.load().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Re-read the source. On failure the current registry stays in place.
    pub fn reload(&self) -> Result<usize, ServiceError> {
        let map = match &self.source {
            KeySource::Inline(raw) => parse_registry(raw.as_bytes())?,
            KeySource::Static => return Ok(self.len()),
            KeySource::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ServiceError::not_found("key registry file"),
                    _ => ServiceError::from(e),
                })?;
                let map = parse_registry(&bytes)?;
                self.remember_mtime(modified(path));
                map
            }
        };
        let count = map.len();
        self.map.store(Arc::new(map));
        info!(keys = count, source = self.source.label(), "key registry reloaded");
        Ok(count)
    }

    /// Reload when the backing file's modification time moved. Returns whether
    /// a reload happened.
    pub fn reload_if_changed(&self) -> Result<bool, ServiceError> {
        let KeySource::File(path) = &self.source else { return Ok(false) };
        let Some(current) = modified(path) else { return Ok(false) };
        let previous = *self.last_modified.lock().unwrap_or_else(|p| p.into_inner());
        if previous == Some(current) {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Poll the key file on a fixed interval.
    pub fn spawn_polling(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.reload_if_changed() {
                    warn!(error = %e, "key registry poll failed; keeping previous keys");
                }
            }
        })
    }

    fn remember_mtime(&self, mtime: Option<SystemTime>) {
        *self.last_modified.lock().unwrap_or_else(|p| p.into_inner()) = mtime;
    }
}

impl KeySource {
    fn label(&self) -> &'static str {
        match self {
            KeySource::Inline(_) => "inline",
            KeySource::File(_) => "file",
            KeySource::Static => "static",
        }
    }
}

fn parse_registry(bytes: &[u8]) -> Result<HashMap<String, String>, ServiceError> {
    let doc: RegistryDoc = serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::validation(format!("malformed key registry: {e}")))?;
    let entries = match doc {
        RegistryDoc::Wrapped { keys } => keys,
        RegistryDoc::Bare(keys) => keys,
    };
    Ok(entries
        .into_iter()
        .filter(|e| !e.key.trim().is_empty())
        .map(|e| (e.key, e.user))
        .collect())
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

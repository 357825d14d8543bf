use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::RwLock};

use crate::errors::ServiceError;

/// JSON file-backed document store.
///
/// Keeps a document `D` in memory and rewrites the whole file after every
/// mutation. Writers are serialized by the lock; other processes writing the
/// same file are not coordinated.
pub struct JsonFileStore<D> {
    inner: RwLock<D>,
    file_path: PathBuf,
}

impl<D> JsonFileStore<D>
where
    D: Serialize + DeserializeOwned + Default + Clone + Send + Sync,
{
    /// Open the store at `path`. Creates the file with an empty document if
    /// missing; a malformed file is an error rather than silently emptied.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let doc = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => D::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ServiceError::Db(format!("malformed store file {}: {e}", file_path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = D::default();
                write_atomic(&file_path, &empty).await?;
                empty
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { inner: RwLock::new(doc), file_path })
    }

    /// Run a read-only closure against the document.
    pub async fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        let doc = self.inner.read().await;
        f(&doc)
    }

    /// Apply a mutation to a copy, persist it, then publish it while still
    /// holding the write lock. On any error the in-memory document is unchanged.
    pub async fn update<R>(
        &self,
        f: impl FnOnce(&mut D) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut doc = self.inner.write().await;
        let mut next = doc.clone();
        let out = f(&mut next)?;
        write_atomic(&self.file_path, &next).await?;
        *doc = next;
        Ok(out)
    }
}

async fn write_atomic<D: Serialize>(path: &Path, doc: &D) -> Result<(), ServiceError> {
    let data = serde_json::to_vec_pretty(doc)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

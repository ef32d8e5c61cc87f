//! Local directory store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::BlobStore;
use crate::error::StorageError;

/// Distinguishes temp files written concurrently by this process.
static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store rooted at a directory. Keys map to relative paths below the root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map `key` to a path below the root.
    ///
    /// Rejects keys that are empty, absolute or that contain `.`/`..`
    /// segments, so no key can address a file outside the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if key.is_empty() || key.contains('\\') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }
        if key.split('/').any(|segment| segment.is_empty() || segment == ".") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Write through a sibling temp file and rename it into place.
    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("thumb");
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        let seq = WRITE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path = parent.join(format!(".{file_name}.tmp-{nonce}-{seq}"));

        if let Err(err) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        Self::write_atomic(&path, &data).await?;
        debug!(path = %path.display(), bytes = data.len(), "Stored object");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

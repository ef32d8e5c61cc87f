//! Blob stores for source images and generated thumbnails.
//!
//! The image store is only read; the thumbnail store is also written, once
//! per cache key. Both are addressed by slash-separated keys.
//!
//! # Implementations
//!
//! - [`FsStore`]: a directory on local disk
//! - [`S3Store`]: an S3 or S3-compatible bucket
//! - [`MemoryStore`]: a size-bounded LRU map, for tests and small deployments

mod fs;
mod memory;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

pub use fs::FsStore;
pub use memory::{MemoryStore, DEFAULT_MEMORY_STORE_CAPACITY};
pub use s3::{create_s3_client, S3Store};

/// Key-addressed byte storage.
///
/// Implementations must be safe to share across request tasks. A `store`
/// must never leave a partially written object visible under `key`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Read the full object under `key`.
    ///
    /// Returns `StorageError::NotFound` when there is no such object.
    async fn load(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Write `data` under `key`, replacing any existing object.
    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn BlobStore>;

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key).await
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        (**self).load(key).await
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        (**self).store(key, data).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

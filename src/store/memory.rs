//! In-memory store with size-based LRU eviction.
//!
//! Evicting an entry only means the thumbnail will be regenerated on the
//! next request, so a bounded memory store is a valid thumbnail store.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use super::BlobStore;
use crate::error::StorageError;

/// Default capacity: 256MB
pub const DEFAULT_MEMORY_STORE_CAPACITY: usize = 256 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 100_000;

struct Inner {
    entries: LruCache<String, Bytes>,
    size: usize,
}

/// Bounded in-memory store.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_size: usize,
}

impl MemoryStore {
    /// Create a store with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_STORE_CAPACITY)
    }

    /// Create a store holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a store bounded by both total bytes and entry count.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(Inner {
                entries: LruCache::new(max_entries),
                size: 0,
            }),
            max_size,
        }
    }

    /// Get the number of stored objects.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Get the total size of stored objects in bytes.
    pub async fn size(&self) -> usize {
        self.inner.read().await.size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.inner.read().await.entries.contains(key))
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        let mut inner = self.inner.write().await;
        inner
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("memory://{}", key)))
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        // Would evict everything, itself included
        if data.len() > self.max_size {
            return Err(StorageError::TooLarge {
                size: data.len(),
                capacity: self.max_size,
            });
        }

        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let data_size = data.len();

        if let Some(old) = inner.entries.peek(key) {
            inner.size = inner.size.saturating_sub(old.len());
        }

        // Entry-count eviction happens inside put
        if let Some((evicted_key, evicted)) = inner.entries.push(key.to_string(), data) {
            if evicted_key != key {
                inner.size = inner.size.saturating_sub(evicted.len());
            }
        }
        inner.size += data_size;

        while inner.size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.size = inner.size.saturating_sub(evicted.len()),
                None => break,
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory://({} bytes)", self.max_size)
    }
}

//! Cache storage collaborator interface.
//!
//! The cache persists through a single two-tier store: an in-process map
//! holding validated entries and a durable byte-oriented backend. The
//! memory tier is synchronous; the persistent tier awaits I/O. Entries
//! cross the persistent boundary as serialized `{payload, expires_at}`
//! blobs, a format internal to this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-level failure from the persistent tier.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// The blocking task running the operation failed to complete.
    #[error("cache task error: {0}")]
    Task(String),
}

/// A cached payload with its expiry instant.
///
/// Present in the memory tier only after validation; the persistent tier
/// holds the serialized form and is the source of truth across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self { payload, expires_at }
    }

    /// Whether the entry's lifetime has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Serialize for the persistent tier.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize a persistent-tier blob. `None` means the blob is
    /// corrupt and the caller should drop the key.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// Two-tier key/value storage consumed by the tiered cache.
///
/// Memory-tier operations are synchronous and infallible; persistent-tier
/// operations await I/O and surface [`StoreError`]. Implementations must
/// keep each memory-tier operation atomic per key so interleaved tasks
/// never observe a partially written entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn memory_get(&self, key: &str) -> Option<CacheEntry>;

    fn memory_set(&self, key: &str, entry: CacheEntry);

    fn memory_delete(&self, key: &str);

    /// Drop every memory-tier entry.
    fn memory_clear(&self);

    async fn disk_get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn disk_set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn disk_delete(&self, key: &str) -> Result<(), StoreError>;

    /// List persistent-tier keys starting with `prefix`.
    async fn disk_list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Memory-only [`CacheStore`] for hosts without durable storage.
///
/// The persistent tier reports empty: reads return `None`, writes and
/// deletes succeed without effect.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn memory_get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    fn memory_set(&self, key: &str, entry: CacheEntry) {
        self.entries.write().insert(key.to_owned(), entry);
    }

    fn memory_delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn memory_clear(&self) {
        self.entries.write().clear();
    }

    async fn disk_get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    async fn disk_set(&self, _key: &str, _value: Vec<u8>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn disk_delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn disk_list_keys(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }
}

//! Tiered response cache with TTL and offline fallback.
//!
//! Reads consult the memory tier first, then the persistent tier,
//! promoting persistent hits into memory. Expiry favors availability over
//! freshness only when the network is down: an expired entry is served
//! while offline and treated as a miss while online. Corrupt persistent
//! entries are dropped on read and never surfaced to the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use super::key;
use super::policy::CachePolicy;
use super::stats::{CacheUsage, UsageCollector};
use super::store::{CacheEntry, CacheStore, StoreError};
use crate::connectivity::ConnectivityOracle;
use crate::http::HttpMethod;
use crate::time::{Clock, SystemClock};

/// Two-tier response cache keyed by request method and URL.
///
/// # Type Parameters
/// - `C`: Clock type for expiry computation (defaults to [`SystemClock`])
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use meridian_client::cache::{CachePolicy, SqliteCacheStore, TieredCache};
/// use meridian_client::connectivity::StaticConnectivity;
/// use meridian_client::http::HttpMethod;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteCacheStore::open("cache.db")?);
/// let cache = TieredCache::new(store, Arc::new(StaticConnectivity::online()), "meridian");
///
/// let key = cache.request_key(HttpMethod::Get, "https://api.example.com/v1/items");
/// cache.set(&key, b"[]".to_vec(), &CachePolicy::ttl(Duration::from_secs(600))).await;
/// assert_eq!(cache.get(&key).await.as_deref(), Some(&b"[]"[..]));
/// # Ok(())
/// # }
/// ```
pub struct TieredCache<C = SystemClock>
where
    C: Clock,
{
    store: Arc<dyn CacheStore>,
    connectivity: Arc<dyn ConnectivityOracle>,
    namespace: String,
    usage: UsageCollector,
    clock: C,
}

impl TieredCache<SystemClock> {
    /// Create a cache using the system clock.
    pub fn new(
        store: Arc<dyn CacheStore>,
        connectivity: Arc<dyn ConnectivityOracle>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::with_clock(store, connectivity, namespace, SystemClock)
    }
}

impl<C> TieredCache<C>
where
    C: Clock,
{
    /// Create a cache with a custom clock (useful for testing).
    pub fn with_clock(
        store: Arc<dyn CacheStore>,
        connectivity: Arc<dyn ConnectivityOracle>,
        namespace: impl Into<String>,
        clock: C,
    ) -> Self {
        Self {
            store,
            connectivity,
            namespace: namespace.into(),
            usage: UsageCollector::new(),
            clock,
        }
    }

    /// Cache key for a request under this cache's namespace.
    pub fn request_key(&self, method: HttpMethod, url: &str) -> String {
        key::request_key(&self.namespace, method.as_str(), url)
    }

    /// Look up a payload.
    ///
    /// Returns `None` when nothing servable exists: no entry in either
    /// tier, or an expired entry while the network is reachable.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lookup(key, false).await
    }

    /// Look up a payload, serving expired entries even while online.
    ///
    /// For callers whose transport has already failed; at that point the
    /// connectivity oracle may still lag behind reality.
    pub async fn get_allow_stale(&self, key: &str) -> Option<Vec<u8>> {
        self.lookup(key, true).await
    }

    async fn lookup(&self, key: &str, allow_stale: bool) -> Option<Vec<u8>> {
        let now = self.clock.now_utc();

        if let Some(entry) = self.store.memory_get(key) {
            if !entry.is_expired(now) {
                self.usage.record_hit();
                return Some(entry.payload);
            }
            if allow_stale || !self.connectivity.is_online() {
                debug!(key, "serving expired cache entry");
                self.usage.record_stale();
                return Some(entry.payload);
            }
            // Expired while online: fall through to the persistent tier,
            // which may hold a fresher entry
        }

        let blob = match self.store.disk_get(key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                self.usage.record_miss();
                return None;
            }
            Err(err) => {
                warn!(key, error = %err, "persistent cache read failed");
                self.usage.record_miss();
                return None;
            }
        };

        let Some(entry) = CacheEntry::from_bytes(&blob) else {
            warn!(key, "dropping corrupt cache entry");
            self.usage.record_corruption();
            if let Err(err) = self.store.disk_delete(key).await {
                warn!(key, error = %err, "failed to drop corrupt cache entry");
            }
            self.usage.record_miss();
            return None;
        };

        self.store.memory_set(key, entry.clone());

        if !entry.is_expired(now) {
            self.usage.record_hit();
            return Some(entry.payload);
        }
        if allow_stale || !self.connectivity.is_online() {
            debug!(key, "serving expired cache entry");
            self.usage.record_stale();
            return Some(entry.payload);
        }
        self.usage.record_miss();
        None
    }

    /// Write a payload under `policy`.
    ///
    /// Each enabled tier receives the entry; a persistent-tier failure is
    /// logged and does not fail the write.
    pub async fn set(&self, key: &str, payload: Vec<u8>, policy: &CachePolicy) {
        let ttl = chrono::Duration::from_std(policy.ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now_utc()
            .checked_add_signed(ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        let entry = CacheEntry::new(payload, expires_at);

        if policy.use_memory_tier {
            self.store.memory_set(key, entry.clone());
        }
        if policy.use_disk_tier {
            if let Err(err) = self.store.disk_set(key, entry.to_bytes()).await {
                warn!(key, error = %err, "persistent cache write failed");
            }
        }
        self.usage.record_write();
    }

    /// Delete a key from both tiers.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.memory_delete(key);
        self.store.disk_delete(key).await
    }

    /// Drop the whole memory tier and every namespaced persistent entry.
    ///
    /// Persistent keys outside this cache's namespace are untouched.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.memory_clear();

        let keys = self.store.disk_list_keys(&self.prefix()).await?;
        let removed = keys.len();
        for key in keys {
            self.store.disk_delete(&key).await?;
        }
        debug!(removed, "cleared namespaced cache entries");
        Ok(())
    }

    /// Total size in bytes of namespaced persistent entries.
    ///
    /// Approximate, for diagnostics; nothing is evicted by size.
    pub async fn size(&self) -> Result<u64, StoreError> {
        let keys = self.store.disk_list_keys(&self.prefix()).await?;
        let mut total = 0;
        for key in keys {
            if let Some(blob) = self.store.disk_get(&key).await? {
                total += blob.len() as u64;
            }
        }
        Ok(total)
    }

    /// Snapshot of usage counters.
    pub fn usage(&self) -> CacheUsage {
        self.usage.snapshot()
    }

    fn prefix(&self) -> String {
        key::namespace_prefix(&self.namespace)
    }
}

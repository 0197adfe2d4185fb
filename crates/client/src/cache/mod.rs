//! Tiered response caching with TTL and offline fallback
//!
//! This module caches HTTP response payloads across two tiers: a fast
//! in-process memory map and a durable persistent store. Reads consult
//! memory first, promote persistent hits, and apply one expiry rule
//! everywhere: serve fresh entries always, serve expired entries only
//! while offline.
//!
//! # Features
//!
//! - **Two tiers**: volatile memory in front, SQLite (or any
//!   [`CacheStore`]) behind
//! - **Stale-while-offline**: expired entries are served when the network
//!   is down, never when it is up
//! - **Per-call policies**: TTL, tier selection, and offline-only reads
//!   configured at the call site via [`CachePolicy`]
//! - **Corruption recovery**: undecodable persistent entries are deleted
//!   and treated as misses
//! - **Namespace isolation**: `clear` touches only this cache's keys, so
//!   the persistent store can be shared with other application data
//! - **Testable**: Clock abstraction for deterministic TTL testing
//!
//! # Examples
//!
//! ## Cache a response payload
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use meridian_client::cache::{CachePolicy, SqliteCacheStore, TieredCache};
//! use meridian_client::connectivity::StaticConnectivity;
//! use meridian_client::http::HttpMethod;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteCacheStore::open("cache.db")?);
//! let cache = TieredCache::new(store, Arc::new(StaticConnectivity::online()), "meridian");
//!
//! let key = cache.request_key(HttpMethod::Get, "https://api.example.com/v1/items");
//! cache.set(&key, b"[]".to_vec(), &CachePolicy::ttl(Duration::from_secs(600))).await;
//! let payload = cache.get(&key).await;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```
//!
//! ## Offline fallback only
//! ```
//! use std::time::Duration;
//!
//! use meridian_client::cache::CachePolicy;
//!
//! let policy = CachePolicy::offline_fallback(Duration::from_secs(3600));
//! assert!(policy.offline_only);
//! ```

mod key;
mod policy;
mod sqlite;
mod stats;
mod store;
mod tiered;

// Re-export public API
pub use key::{namespace_prefix, request_key};
pub use policy::{CachePolicy, CachePolicyBuilder, DEFAULT_TTL};
pub use sqlite::SqliteCacheStore;
pub use stats::CacheUsage;
pub use store::{CacheEntry, CacheStore, MemoryCacheStore, StoreError};
pub use tiered::TieredCache;

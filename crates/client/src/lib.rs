//! # Meridian Client
//!
//! Client-side runtime for talking to the Meridian API: a request
//! pipeline that attaches bearer tokens, caches responses across a
//! memory and a SQLite tier, and recovers from expired-token failures
//! through a single-flight refresh coordinator.
//!
//! This crate contains:
//! - [`pipeline`]: the [`ApiClient`](pipeline::ApiClient) request pipeline
//! - [`auth`]: token stores and the refresh coordinator
//! - [`cache`]: the tiered response cache
//! - [`http`]: the transport abstraction and its reqwest implementation
//! - [`connectivity`]: network reachability signals
//! - [`time`]: clock abstraction for expiry computation
//!
//! ## Architecture
//! - Depends only on `meridian-domain` among Meridian crates
//! - Every collaborator is injected through builders; nothing is global

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod cache;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod pipeline;
pub mod time;

// Re-export commonly used types and traits for convenience
pub use auth::{KeychainTokenStore, MemoryTokenStore, RefreshCoordinator, TokenKind, TokenStore};
pub use cache::{CachePolicy, SqliteCacheStore, TieredCache};
pub use connectivity::{ConnectivityOracle, SharedConnectivity, StaticConnectivity};
pub use errors::BuildError;
pub use http::{HttpMethod, ReqwestTransport, Transport};
pub use pipeline::{ApiClient, ApiRequest, ApiResponse, CacheableRoute};

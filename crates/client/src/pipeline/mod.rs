//! Request pipeline for authenticated, cache-aware API calls.
//!
//! ## Features
//!
//! - **Bearer attachment**: the stored access token rides on every
//!   request; an empty token sends no header
//! - **Cache-aware reads**: allow-listed endpoints short-circuit to the
//!   tiered cache and write successful responses through
//! - **Transparent recovery**: 401/403 responses are retried once behind
//!   the refresh coordinator; transport failures fall back to the cache
//! - **Correlation ids**: every call logs under a generated id
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  ApiClient                  │
//! │  resolve → cache read → send → classify     │
//! └──────┬──────────┬───────────┬───────────────┘
//!        │          │           │
//!        ▼          ▼           ▼
//!  TieredCache  Transport  RefreshCoordinator
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use meridian_client::cache::CachePolicy;
//! use meridian_client::pipeline::{ApiClient, ApiRequest, CacheableRoute};
//!
//! # async fn example(client: ApiClient) -> Result<(), Box<dyn std::error::Error>> {
//! let request = ApiRequest::get("/v1/course/category")
//!     .with_cache(CachePolicy::ttl(Duration::from_secs(600)));
//! let response = client.execute(request).await?;
//! let categories: Vec<String> = response.json()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod request;

pub use client::{ApiClient, ApiClientBuilder};
pub use request::{ApiRequest, ApiResponse, CacheableRoute};

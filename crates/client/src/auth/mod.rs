//! Bearer Token Lifecycle Infrastructure
//!
//! This module owns everything token-shaped in the client: where tokens are
//! stored, how they are attached to requests, and how a fleet of concurrent
//! requests recovers when the server starts rejecting the access token.
//!
//! # Features
//!
//! - **Single-Flight Refresh**: Any number of simultaneous auth failures
//!   collapse into one refresh network call
//! - **Ordered Retries**: Requests queued during a refresh are re-issued in
//!   arrival order once the new token lands
//! - **Keychain Storage**: Tokens persist in the platform keychain via the
//!   [`KeychainTokenStore`]
//! - **Host Callbacks**: A failed refresh clears credentials and notifies
//!   the host exactly once per cycle
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  RefreshCoordinator │  Idle -> Refreshing state machine
//! └──────────┬──────────┘
//!            │
//!            ├──► Transport          (refresh call + queued retries)
//!            ├──► TokenStore         (read/write/delete token pair)
//!            │         │
//!            │         ├──► KeychainTokenStore  (platform keychain)
//!            │         └──► MemoryTokenStore    (tests, ephemeral use)
//!            │
//!            └──► UnauthenticatedFn  (host logout hook)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use meridian_client::auth::{KeychainTokenStore, RefreshCoordinator, RenewedTokens};
//! use meridian_client::http::ReqwestTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::builder().build()?);
//! let store = Arc::new(KeychainTokenStore::new("Meridian"));
//!
//! let coordinator = Arc::new(
//!     RefreshCoordinator::builder()
//!         .transport(transport)
//!         .token_store(store)
//!         .refresh_url("https://api.meridian.dev/v1/auth/refresh")
//!         .payload_builder(|refresh| {
//!             serde_json::json!({ "grant_type": "refresh_token", "refresh_token": refresh })
//!         })
//!         .response_parser(|body| {
//!             serde_json::from_slice::<RenewedTokens>(body).unwrap_or_default()
//!         })
//!         .on_unauthenticated(|| println!("signed out"))
//!         .build()?,
//! );
//! # let _ = coordinator;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod keychain;
mod store;
mod types;

pub use coordinator::{RefreshCoordinator, RefreshCoordinatorBuilder};
pub use keychain::KeychainTokenStore;
pub use store::{MemoryTokenStore, TokenStore};
pub use types::{
    RefreshParseFn, RefreshPayloadFn, RenewedTokens, TokenKind, TokenPair, UnauthenticatedFn,
};

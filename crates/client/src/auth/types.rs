//! Token data types and refresh callback signatures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Which stored token a [`TokenStore`](super::TokenStore) operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Short-lived bearer token attached to outgoing requests
    Access,
    /// Long-lived token exchanged for new access tokens
    Refresh,
}

/// An access token together with its optional refresh token.
///
/// Owned by the token store; never written to the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer token attached to requests
    pub access_token: String,
    /// Token used to renew the pair; absent for providers that do not
    /// support renewal
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token }
    }
}

/// Tokens extracted from a refresh response by the host's parser.
///
/// `None` (or an empty string) for `access_token` means the response did not
/// yield a usable token and the refresh cycle fails. An omitted
/// `refresh_token` keeps the previously stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenewedTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Builds the refresh request body from the stored refresh token.
pub type RefreshPayloadFn = Arc<dyn Fn(&str) -> serde_json::Value + Send + Sync>;

/// Parses the raw refresh response body into token material.
pub type RefreshParseFn = Arc<dyn Fn(&[u8]) -> RenewedTokens + Send + Sync>;

/// Invoked exactly once per failed refresh cycle, after tokens are cleared.
pub type UnauthenticatedFn = Arc<dyn Fn() + Send + Sync>;

//! Error types used throughout the client runtime

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Meridian request handling
///
/// Every failure surfaced by the request pipeline is one of these variants.
/// Transport-level failures map onto [`MeridianError::NoNetwork`],
/// [`MeridianError::Timeout`], or [`MeridianError::Unknown`]; HTTP statuses
/// map through [`MeridianError::from_status`].
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MeridianError {
    /// The network is unreachable (connection refused, DNS failure, offline)
    #[error("No network connection: {0}")]
    NoNetwork(String),

    /// The request exceeded the transport's time budget
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server rejected the request's credentials (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the request as malformed (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The upstream is down or overloaded (HTTP 500/502/503)
    #[error("Server unavailable: {0}")]
    ServerUnavailable(String),

    /// Anything that does not fit the categories above
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Broad categories used for retry and fallback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient connectivity problems
    Connectivity,
    /// Credential problems; fixed by re-authentication, not by retrying
    Auth,
    /// The request itself is wrong; retrying cannot help
    Client,
    /// Upstream failures that may clear on their own
    Server,
    /// Unclassified
    Unknown,
}

impl MeridianError {
    /// Map an HTTP status code onto the error taxonomy.
    ///
    /// 401 and 403 both classify as [`MeridianError::Unauthorized`]; 500,
    /// 502, and 503 classify as [`MeridianError::ServerUnavailable`] and
    /// must never be treated as auth failures by callers.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            400 => Self::BadRequest(detail),
            401 | 403 => Self::Unauthorized(detail),
            500 | 502 | 503 => Self::ServerUnavailable(detail),
            _ => Self::Unknown(format!("HTTP {status}: {detail}")),
        }
    }

    /// Category of this error, for host retry/backoff policy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoNetwork(_) | Self::Timeout(_) => ErrorCategory::Connectivity,
            Self::Unauthorized(_) => ErrorCategory::Auth,
            Self::BadRequest(_) => ErrorCategory::Client,
            Self::ServerUnavailable(_) => ErrorCategory::Server,
            Self::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether retrying the same request later could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Connectivity | ErrorCategory::Server)
    }

    /// Whether this error should trigger a token refresh cycle
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result type alias for Meridian operations
pub type Result<T> = std::result::Result<T, MeridianError>;

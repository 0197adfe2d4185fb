//! Construction-time errors and conversions from transport-library errors.

use meridian_domain::MeridianError;
use thiserror::Error;

/// Errors raised while assembling a component from its builder
///
/// These never occur at request time; a successfully built client only
/// surfaces [`MeridianError`] values.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required component was not supplied
    #[error("Missing required component: {0}")]
    MissingComponent(&'static str),

    /// The base URL could not be parsed
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be initialized
    #[error("HTTP client initialization failed: {0}")]
    HttpInit(String),

    /// Token refresh parameters were supplied partially
    ///
    /// Refresh endpoint, payload builder, and response parser come as a
    /// complete set or not at all.
    #[error("Incomplete refresh configuration: {0}")]
    IncompleteRefresh(String),
}

/// Extension trait keeping reqwest error classification in one place.
pub(crate) trait IntoMeridianError {
    fn into_meridian(self) -> MeridianError;
}

impl IntoMeridianError for reqwest::Error {
    fn into_meridian(self) -> MeridianError {
        if self.is_timeout() {
            return MeridianError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MeridianError::NoNetwork("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let reason = status.canonical_reason().unwrap_or("unknown status");
            return MeridianError::from_status(code, reason);
        }

        MeridianError::Unknown(self.to_string())
    }
}

//! OS-keychain token store.
//!
//! Persists tokens via the platform credential service: Keychain Access on
//! macOS, Credential Manager on Windows, the Secret Service API on Linux.
//! Backend failures are absorbed and warn-logged so reads degrade to
//! "unauthenticated" instead of failing the request path.

use keyring::Entry;
use tracing::{debug, warn};

use super::store::TokenStore;
use super::types::TokenKind;

/// Token store backed by the platform keychain
pub struct KeychainTokenStore {
    service_name: String,
}

impl KeychainTokenStore {
    /// Create a keychain-backed store for a specific service
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g., "Meridian.tokens")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    const fn account(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Access => "access-token",
            TokenKind::Refresh => "refresh-token",
        }
    }

    fn entry(&self, kind: TokenKind) -> Result<Entry, keyring::Error> {
        Entry::new(&self.service_name, Self::account(kind))
    }

    fn delete_kind(&self, kind: TokenKind) {
        match self.entry(kind) {
            Ok(entry) => {
                if let Err(err) = entry.delete_credential() {
                    if !matches!(err, keyring::Error::NoEntry) {
                        warn!(
                            service = %self.service_name,
                            ?kind,
                            error = %err,
                            "keychain delete failed"
                        );
                    }
                }
            }
            Err(err) => {
                warn!(service = %self.service_name, ?kind, error = %err, "keychain entry failed");
            }
        }
    }
}

impl TokenStore for KeychainTokenStore {
    fn read(&self, kind: TokenKind) -> String {
        match self.entry(kind).and_then(|entry| entry.get_password()) {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => String::new(),
            Err(err) => {
                warn!(service = %self.service_name, ?kind, error = %err, "keychain read failed");
                String::new()
            }
        }
    }

    fn write(&self, kind: TokenKind, value: &str) {
        debug!(service = %self.service_name, ?kind, "storing token in keychain");
        if let Err(err) = self.entry(kind).and_then(|entry| entry.set_password(value)) {
            warn!(service = %self.service_name, ?kind, error = %err, "keychain write failed");
        }
    }

    fn delete(&self) {
        debug!(service = %self.service_name, "deleting tokens from keychain");
        self.delete_kind(TokenKind::Access);
        self.delete_kind(TokenKind::Refresh);
    }
}

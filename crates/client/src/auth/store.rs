//! Token persistence boundary.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::types::TokenKind;

/// Trait for token storage backends
///
/// This trait abstracts credential storage to enable testing with in-memory
/// implementations and to support different backends (OS keychain, encrypted
/// files, remote vaults).
///
/// The boundary is deliberately infallible: implementations absorb backend
/// errors, log them, and present an empty string for unreadable tokens. An
/// empty access token means "unauthenticated" to the pipeline, which then
/// sends no Authorization header.
pub trait TokenStore: Send + Sync {
    /// Read a stored token
    ///
    /// # Returns
    /// The token value, or an empty string when absent or unreadable
    fn read(&self, kind: TokenKind) -> String;

    /// Persist a token value, replacing any previous one
    fn write(&self, kind: TokenKind, value: &str);

    /// Delete both stored tokens
    ///
    /// Idempotent; deleting an empty store is not an error.
    fn delete(&self);
}

/// In-memory token store
///
/// Used in tests and by hosts that keep credentials in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeding both tokens
    #[must_use]
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        store.write(TokenKind::Access, access);
        store.write(TokenKind::Refresh, refresh);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self, kind: TokenKind) -> String {
        self.tokens.read().get(&kind).cloned().unwrap_or_default()
    }

    fn write(&self, kind: TokenKind, value: &str) {
        self.tokens.write().insert(kind, value.to_owned());
    }

    fn delete(&self) {
        self.tokens.write().clear();
    }
}

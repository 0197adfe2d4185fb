//! Deterministic cache key derivation.
//!
//! Keys are `{namespace}:{sha256(method, url)}`. Two requests with the same
//! method and fully qualified URL (query string included) always collide to
//! the same key; the cache is per-endpoint, not per-caller. The namespace
//! prefix survives hashing so persisted entries can be enumerated and
//! cleared without touching other application data in the same store.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// # Example
/// ```
/// use meridian_client::cache::request_key;
///
/// let key = request_key("meridian", "GET", "https://api.example.com/v1/items?page=2");
/// assert!(key.starts_with("meridian:"));
/// ```
pub fn request_key(namespace: &str, method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    format!("{namespace}:{}", hex::encode(hasher.finalize()))
}

/// Prefix shared by every key in `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{namespace}:")
}

//! Cache policy types and builder patterns
//!
//! This module provides the per-call-site configuration for the tiered
//! cache: how long entries live, which tiers receive the write, and whether
//! the cached value is consulted at all while the network is reachable.

use std::time::Duration;

/// Default entry lifetime when no TTL is configured explicitly.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Per-call-site cache policy.
///
/// A policy governs how a response is written into the cache and whether
/// the pipeline consults the cache before dispatching. It never alters
/// entries written under an earlier policy; reads apply the expiry stored
/// with each entry.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Time-to-live for entries written under this policy.
    pub ttl: Duration,

    /// Write responses into the in-process memory tier.
    pub use_memory_tier: bool,

    /// Write responses into the persistent tier.
    pub use_disk_tier: bool,

    /// Advisory size bound in bytes. Reported through diagnostics; entries
    /// are not evicted by size.
    pub max_size: Option<u64>,

    /// Consult the cache only while offline. The response is still written
    /// through so it is available when connectivity drops.
    pub offline_only: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            use_memory_tier: true,
            use_disk_tier: true,
            max_size: None,
            offline_only: false,
        }
    }
}

impl CachePolicy {
    /// Create a new policy builder.
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// Quick preset: both tiers with the given TTL.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use meridian_client::cache::CachePolicy;
    ///
    /// let policy = CachePolicy::ttl(Duration::from_secs(600));
    /// assert!(policy.use_memory_tier && policy.use_disk_tier);
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self { ttl: duration, ..Self::default() }
    }

    /// Quick preset: memory tier only, nothing persisted.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use meridian_client::cache::CachePolicy;
    ///
    /// let policy = CachePolicy::memory_only(Duration::from_secs(60));
    /// assert!(!policy.use_disk_tier);
    /// ```
    pub fn memory_only(duration: Duration) -> Self {
        Self { ttl: duration, use_disk_tier: false, ..Self::default() }
    }

    /// Quick preset: cache used purely as an offline fallback.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use meridian_client::cache::CachePolicy;
    ///
    /// let policy = CachePolicy::offline_fallback(Duration::from_secs(3600));
    /// assert!(policy.offline_only);
    /// ```
    pub fn offline_fallback(duration: Duration) -> Self {
        Self { ttl: duration, offline_only: true, ..Self::default() }
    }
}

/// Builder for [`CachePolicy`] with fluent API
#[derive(Debug, Default)]
pub struct CachePolicyBuilder {
    policy: CachePolicy,
}

impl CachePolicyBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set time-to-live for entries
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.policy.ttl = duration;
        self
    }

    /// Enable or disable the memory tier
    pub fn use_memory_tier(mut self, enabled: bool) -> Self {
        self.policy.use_memory_tier = enabled;
        self
    }

    /// Enable or disable the persistent tier
    pub fn use_disk_tier(mut self, enabled: bool) -> Self {
        self.policy.use_disk_tier = enabled;
        self
    }

    /// Set the advisory size bound in bytes
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.policy.max_size = Some(bytes);
        self
    }

    /// Restrict cache reads to offline periods
    pub fn offline_only(mut self, enabled: bool) -> Self {
        self.policy.offline_only = enabled;
        self
    }

    /// Build the policy
    pub fn build(self) -> CachePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::policy.
    use super::*;

    /// Validates `CachePolicy::default` behavior for the policy default
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `policy.ttl` equals `DEFAULT_TTL`.
    /// - Ensures both tiers are enabled.
    /// - Ensures `policy.max_size.is_none()` evaluates to true.
    /// - Ensures `!policy.offline_only` evaluates to true.
    #[test]
    fn test_cache_policy_default() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl, DEFAULT_TTL);
        assert!(policy.use_memory_tier);
        assert!(policy.use_disk_tier);
        assert!(policy.max_size.is_none());
        assert!(!policy.offline_only);
    }

    /// Validates `CachePolicy::ttl` behavior for the ttl preset scenario.
    ///
    /// Assertions:
    /// - Confirms `policy.ttl` equals the supplied duration.
    /// - Ensures both tiers stay enabled.
    #[test]
    fn test_cache_policy_ttl_preset() {
        let ttl = Duration::from_secs(600);
        let policy = CachePolicy::ttl(ttl);

        assert_eq!(policy.ttl, ttl);
        assert!(policy.use_memory_tier);
        assert!(policy.use_disk_tier);
    }

    /// Validates `CachePolicy::memory_only` behavior for the memory only
    /// preset scenario.
    ///
    /// Assertions:
    /// - Ensures the persistent tier is disabled.
    /// - Ensures the memory tier stays enabled.
    #[test]
    fn test_cache_policy_memory_only_preset() {
        let policy = CachePolicy::memory_only(Duration::from_secs(60));

        assert!(policy.use_memory_tier);
        assert!(!policy.use_disk_tier);
    }

    /// Validates `CachePolicy::offline_fallback` behavior for the offline
    /// fallback preset scenario.
    ///
    /// Assertions:
    /// - Ensures `policy.offline_only` evaluates to true.
    /// - Ensures both tiers stay enabled.
    #[test]
    fn test_cache_policy_offline_fallback_preset() {
        let policy = CachePolicy::offline_fallback(Duration::from_secs(3600));

        assert!(policy.offline_only);
        assert!(policy.use_memory_tier);
        assert!(policy.use_disk_tier);
    }

    /// Validates `CachePolicy::builder` behavior for the policy builder
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms every builder setting lands on the built policy.
    #[test]
    fn test_cache_policy_builder() {
        let policy = CachePolicy::builder()
            .ttl(Duration::from_secs(1800))
            .use_memory_tier(false)
            .use_disk_tier(true)
            .max_size(4096)
            .offline_only(true)
            .build();

        assert_eq!(policy.ttl, Duration::from_secs(1800));
        assert!(!policy.use_memory_tier);
        assert!(policy.use_disk_tier);
        assert_eq!(policy.max_size, Some(4096));
        assert!(policy.offline_only);
    }

    /// Validates `CachePolicy::builder` behavior for the partial builder
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures unset fields keep their defaults.
    #[test]
    fn test_cache_policy_builder_partial() {
        let policy = CachePolicy::builder().ttl(Duration::from_secs(30)).build();

        assert_eq!(policy.ttl, Duration::from_secs(30));
        assert!(policy.use_memory_tier);
        assert!(policy.use_disk_tier);
        assert!(policy.max_size.is_none());
        assert!(!policy.offline_only);
    }
}

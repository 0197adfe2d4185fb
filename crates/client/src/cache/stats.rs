//! Cache usage tracking
//!
//! This module provides counters for observing cache effectiveness: fresh
//! hits, stale entries served while offline, misses, and corrupt entries
//! dropped from the persistent tier.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cache effectiveness counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    /// Reads served from an unexpired entry
    pub hits: u64,

    /// Reads that found nothing servable
    pub misses: u64,

    /// Expired entries served under the stale-while-offline policy
    pub stale_served: u64,

    /// Corrupt persistent-tier entries dropped during reads
    pub corruption_dropped: u64,

    /// Write-through operations
    pub writes: u64,
}

impl CacheUsage {
    /// Fraction of reads that returned a payload (fresh or stale)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_reads();
        if total == 0 {
            0.0
        } else {
            (self.hits + self.stale_served) as f64 / total as f64
        }
    }

    /// Total number of read operations
    pub fn total_reads(&self) -> u64 {
        self.hits + self.stale_served + self.misses
    }
}

/// Thread-safe usage collector for cache operations
///
/// Uses atomic counters so recording never contends with cache reads and
/// writes.
#[derive(Debug, Default)]
pub(crate) struct UsageCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
    corruption_dropped: AtomicU64,
    writes: AtomicU64,
}

impl UsageCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corruption(&self) {
        self.corruption_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheUsage {
        CacheUsage {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            corruption_dropped: self.corruption_dropped.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

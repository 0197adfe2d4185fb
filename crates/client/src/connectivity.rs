//! Network reachability reporting
//!
//! The cache and pipeline never probe the network themselves; they consult a
//! [`ConnectivityOracle`] supplied by the host. Reachability only changes
//! how expired cache entries are treated (stale-while-offline), never
//! whether a request is attempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports current network reachability
pub trait ConnectivityOracle: Send + Sync {
    /// Whether the network is currently reachable
    fn is_online(&self) -> bool;
}

/// Oracle that reports a fixed reachability value
///
/// Useful for hosts without a reachability watcher (assume online) and for
/// tests that pin one side of the offline policy.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity {
    online: bool,
}

impl StaticConnectivity {
    /// Oracle that always reports online
    #[must_use]
    pub const fn online() -> Self {
        Self { online: true }
    }

    /// Oracle that always reports offline
    #[must_use]
    pub const fn offline() -> Self {
        Self { online: false }
    }
}

impl ConnectivityOracle for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online
    }
}

/// Oracle backed by a shared flag
///
/// The host's reachability watcher flips the flag; clones observe the same
/// state. Tests use it to simulate connectivity loss mid-scenario.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    /// Create a shared oracle with an initial reachability value
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        Self { online: Arc::new(AtomicBool::new(initially_online)) }
    }

    /// Update the reachability value observed by all clones
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityOracle for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

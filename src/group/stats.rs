//! Namespace Statistics
//!
//! Lock-free counters describing how a namespace served its lookups.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters of one namespace.
#[derive(Debug, Default)]
pub struct NamespaceStats {
    /// Lookups with a non-empty key
    pub(crate) gets: AtomicU64,
    /// Lookups answered by the local store
    pub(crate) cache_hits: AtomicU64,
    /// Misses entering the coalescer
    pub(crate) loads: AtomicU64,
    /// Coalesced loads actually executed
    pub(crate) loads_deduped: AtomicU64,
    /// Values fetched from a remote peer
    pub(crate) peer_loads: AtomicU64,
    /// Failed peer fetches
    pub(crate) peer_errors: AtomicU64,
    /// Successful loader calls
    pub(crate) local_loads: AtomicU64,
    /// Failed loader calls
    pub(crate) local_load_errors: AtomicU64,
    /// Lookups received from other peers
    pub(crate) server_requests: AtomicU64,
}

/// Point-in-time copy of [`NamespaceStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceStatsSnapshot {
    /// Lookups with a non-empty key
    pub gets: u64,
    /// Lookups answered by the local store
    pub cache_hits: u64,
    /// Lookups that missed the store (coalesced or not)
    pub loads: u64,
    /// Miss executions actually run after coalescing
    pub loads_deduped: u64,
    /// Values served by a remote peer
    pub peer_loads: u64,
    /// Remote peer failures that fell back to the loader
    pub peer_errors: u64,
    /// Successful loader calls
    pub local_loads: u64,
    /// Failed loader calls
    pub local_load_errors: u64,
    /// Requests received from other peers
    pub server_requests: u64,
}

pub(crate) fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl NamespaceStats {
    pub fn snapshot(&self) -> NamespaceStatsSnapshot {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        NamespaceStatsSnapshot {
            gets: read(&self.gets),
            cache_hits: read(&self.cache_hits),
            loads: read(&self.loads),
            loads_deduped: read(&self.loads_deduped),
            peer_loads: read(&self.peer_loads),
            peer_errors: read(&self.peer_errors),
            local_loads: read(&self.local_loads),
            local_load_errors: read(&self.local_load_errors),
            server_requests: read(&self.server_requests),
        }
    }
}

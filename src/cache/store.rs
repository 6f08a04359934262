//! Bounded Store Module
//!
//! Byte-capacity key/value table with least-recently-used eviction.

use std::fmt;
use std::sync::Arc;

use lru::LruCache;

use crate::cache::{ByteView, CacheStats};

/// Callback fired with every evicted entry.
pub type EvictionHook = Arc<dyn Fn(&str, &ByteView) + Send + Sync>;

/// Bytes accounted to one entry.
pub fn entry_size(key: &str, value: &ByteView) -> usize {
    key.len() + value.len()
}

// == Bounded Store ==
/// Recency-ordered store bounded by the total size of its entries.
///
/// `used_bytes` always equals the sum of `len(key) + len(value)` over the
/// stored entries and, unless the capacity is 0 (unbounded), never exceeds
/// `capacity_bytes` once a mutation returns.
///
/// The store does no locking of its own; every call, `get` included, mutates
/// recency and must run under one exclusive lock. Lookups, promotions and
/// evictions are O(1).
pub struct BoundedStore {
    /// Entries in recency order, unbounded by count
    entries: LruCache<String, ByteView>,
    /// Hit/miss/eviction counters
    stats: CacheStats,
    /// Byte budget, 0 = unbounded
    capacity_bytes: usize,
    /// Sum of `entry_size` over all entries
    used_bytes: usize,
    /// Called with every evicted entry
    on_evicted: Option<EvictionHook>,
}

impl BoundedStore {
    // == Constructor ==
    /// Creates an empty store. A capacity of 0 disables eviction.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            stats: CacheStats::new(capacity_bytes),
            capacity_bytes,
            used_bytes: 0,
            on_evicted: None,
        }
    }

    /// Creates an empty store that reports evictions to `hook`.
    pub fn with_eviction_hook(capacity_bytes: usize, hook: EvictionHook) -> Self {
        Self {
            on_evicted: Some(hook),
            ..Self::new(capacity_bytes)
        }
    }

    // == Get ==
    /// Looks up a key, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        match self.entries.get(key).cloned() {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Add ==
    /// Inserts or replaces a value, then evicts from the old end until the
    /// store fits its capacity again.
    ///
    /// A single value larger than the capacity is inserted and then evicted
    /// straight away.
    pub fn add(&mut self, key: &str, value: ByteView) {
        let added = value.len();
        match self.entries.put(key.to_string(), value) {
            Some(previous) => {
                self.used_bytes = self.used_bytes - previous.len() + added;
            }
            None => {
                self.used_bytes += key.len() + added;
            }
        }

        while self.capacity_bytes != 0 && self.used_bytes > self.capacity_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    // == Remove Oldest ==
    /// Evicts the least recently used entry, if any, and returns it.
    pub fn remove_oldest(&mut self) -> Option<(String, ByteView)> {
        let (key, value) = self.entries.pop_lru()?;
        self.used_bytes -= entry_size(&key, &value);
        self.stats.record_eviction();

        if let Some(hook) = &self.on_evicted {
            hook(&key, &value);
        }
        Some((key, value))
    }

    /// Returns a value without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<&ByteView> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            used_bytes: self.used_bytes,
            ..self.stats.clone()
        }
    }
}

impl fmt::Debug for BoundedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStore")
            .field("entries", &self.entries.len())
            .field("used_bytes", &self.used_bytes)
            .field("capacity_bytes", &self.capacity_bytes)
            .field("has_eviction_hook", &self.on_evicted.is_some())
            .finish()
    }
}

//! Cache Module
//!
//! Local bounded storage: immutable byte values and byte-capacity LRU
//! eviction.

mod byteview;
mod stats;
mod store;


// Re-export public types
pub use byteview::ByteView;
pub use stats::CacheStats;
pub use store::{entry_size, BoundedStore, EvictionHook};

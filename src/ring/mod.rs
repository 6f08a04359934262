//! Ring Module
//!
//! Consistent hashing used to shard keys across peers.

mod hash_ring;

pub use hash_ring::{default_hash, HashFn, HashRing};

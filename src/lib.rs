//! Peercache - A distributed read-through cache
//!
//! Values live in size-bounded LRU stores, keys are spread across peers with
//! consistent hashing, and concurrent misses for a key are coalesced into a
//! single origin load.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod flight;
pub mod group;
pub mod models;
pub mod peers;
pub mod ring;

pub use api::{create_api_router, create_peer_router, AppState};
pub use cache::{BoundedStore, ByteView};
pub use config::Config;
pub use error::{CacheError, Result};
pub use flight::RequestCoalescer;
pub use group::{loader_fn, Loader, Namespace, NamespaceBuilder, NamespaceRegistry};
pub use peers::{HttpPeerClient, PeerClient, PeerLocator, PeerPool, PoolOptions};
pub use ring::HashRing;

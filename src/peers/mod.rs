//! Peers Module
//!
//! Capabilities for locating the peer that owns a key and fetching values
//! from it, plus the HTTP implementations backed by a hash ring.
//!
//! # Wire protocol
//! `GET <peer><base_path><namespace>/<key>` with both segments
//! percent-encoded. A success status carries the raw value bytes.

mod client;
mod pool;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use client::{encode_segment, HttpPeerClient};
pub use pool::{PeerPool, PoolOptions};

// == Public Constants ==
/// Path prefix of the peer endpoint
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

/// Virtual nodes per peer on the hash ring
pub const DEFAULT_VIRTUAL_NODES: usize = 50;

// == Peer Client ==
/// Fetches values from one remote peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Requests `key` from `namespace` on the remote peer.
    ///
    /// Non-success statuses, transport failures and body read errors all
    /// surface as [`crate::error::CacheError::PeerFetchFailed`]. No retries.
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Bytes>;

    /// Address of the remote peer, for logging.
    fn address(&self) -> &str;
}

// == Peer Locator ==
/// Finds the peer responsible for a key.
pub trait PeerLocator: Send + Sync {
    /// Returns the owning peer, or `None` when no peer owns the key or the
    /// owner is the local process.
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerClient>>;
}

//! Peer Pool
//!
//! Hash-ring backed [`PeerLocator`] over a configured set of HTTP peers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::peers::{HttpPeerClient, PeerClient, PeerLocator, DEFAULT_BASE_PATH, DEFAULT_VIRTUAL_NODES};
use crate::ring::{default_hash, HashFn, HashRing};

// == Pool Options ==
/// Tuning for a [`PeerPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Path prefix of the peer endpoint, starting and ending with `/`
    pub base_path: String,
    /// Virtual nodes per peer
    pub virtual_nodes: usize,
    /// Hash placing keys and virtual nodes on the ring
    pub hash: HashFn,
    /// Timeout applied to every peer request
    pub timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            hash: default_hash,
            timeout: Duration::from_secs(2),
        }
    }
}

struct PoolState {
    /// Key ownership over all peers, self included
    ring: HashRing,
    /// Client per peer address
    clients: HashMap<String, Arc<HttpPeerClient>>,
}

// == Peer Pool ==
/// The set of peers sharing the key space, this process included.
///
/// `set_peers` swaps in a freshly built ring and client table under the write
/// lock; lookups only take the read lock.
pub struct PeerPool {
    /// Normalised address of this process
    self_addr: String,
    /// Base path, ring and transport settings
    options: PoolOptions,
    /// Connection pool shared by every peer client
    http: reqwest::Client,
    /// Current ring and clients, replaced wholesale by `set_peers`
    state: RwLock<PoolState>,
}

/// Strips the trailing `/` so `http://a:1/` and `http://a:1` compare equal.
fn normalize(addr: &str) -> String {
    addr.trim().trim_end_matches('/').to_string()
}

impl PeerPool {
    // == Constructor ==
    /// Creates an empty pool for the process reachable at `self_addr`.
    pub fn new(self_addr: &str, options: PoolOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| CacheError::InvalidConfig(format!("building http client: {}", e)))?;

        Ok(Self {
            self_addr: normalize(self_addr),
            state: RwLock::new(PoolState {
                ring: HashRing::with_hash(options.virtual_nodes, options.hash),
                clients: HashMap::new(),
            }),
            options,
            http,
        })
    }

    // == Set Peers ==
    /// Replaces the peer set. The list should include this process's own
    /// address so it keeps its share of the keys.
    pub fn set_peers<S: AsRef<str>>(&self, peers: &[S]) {
        let peers: Vec<String> = peers
            .iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();

        let mut ring = HashRing::with_hash(self.options.virtual_nodes, self.options.hash);
        ring.add_peers(&peers);

        let clients = peers
            .iter()
            .map(|peer| {
                let client = HttpPeerClient::new(peer, &self.options.base_path, self.http.clone());
                (peer.clone(), Arc::new(client))
            })
            .collect();

        *self.state.write() = PoolState { ring, clients };
        info!(self_addr = %self.self_addr, peers = ?peers, "peer set updated");
    }

    /// Address owning `key` on the ring, this process included.
    pub fn owner(&self, key: &str) -> Option<String> {
        self.state.read().ring.locate(key).map(str::to_string)
    }

    /// Configured peers, sorted.
    pub fn peers(&self) -> Vec<String> {
        self.state.read().ring.peers().map(str::to_string).collect()
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn base_path(&self) -> &str {
        &self.options.base_path
    }
}

impl PeerLocator for PeerPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        let state = self.state.read();
        let peer = state.ring.locate(key)?;
        if peer == self.self_addr {
            return None;
        }
        debug!(peer, key, "picked peer");
        let client: Arc<dyn PeerClient> = state.clients.get(peer)?.clone();
        Some(client)
    }
}

impl std::fmt::Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool")
            .field("self_addr", &self.self_addr)
            .field("options", &self.options)
            .field("ring", &self.state.read().ring)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const PEERS: [&str; 3] = [
        "http://127.0.0.1:8001",
        "http://127.0.0.1:8002",
        "http://127.0.0.1:8003",
    ];

    fn pool(self_addr: &str) -> PeerPool {
        let pool = PeerPool::new(self_addr, PoolOptions::default()).unwrap();
        pool.set_peers(&PEERS);
        pool
    }

    #[test]
    fn test_empty_pool_picks_nothing() {
        let pool = PeerPool::new(PEERS[0], PoolOptions::default()).unwrap();
        assert!(pool.pick("Tom").is_none());
        assert!(pool.owner("Tom").is_none());
    }

    #[test]
    fn test_pick_skips_self() {
        let pool = pool(PEERS[0]);

        for i in 0..200 {
            let key = format!("key-{}", i);
            let owner = pool.owner(&key).unwrap();
            match pool.pick(&key) {
                Some(peer) => {
                    assert_ne!(owner, PEERS[0]);
                    assert_eq!(peer.address(), owner);
                }
                None => assert_eq!(owner, PEERS[0]),
            }
        }
    }

    #[test]
    fn test_all_nodes_agree_on_owner() {
        let pools: Vec<PeerPool> = PEERS.iter().map(|addr| pool(addr)).collect();

        for i in 0..100 {
            let key = format!("user:{}", i);
            let owner = pools[0].owner(&key).unwrap();
            for pool in &pools {
                assert_eq!(pool.owner(&key).unwrap(), owner);
            }
            // exactly one node treats the key as its own
            let local = pools.iter().filter(|p| p.pick(&key).is_none()).count();
            assert_eq!(local, 1);
        }
    }

    #[test]
    fn test_single_node_pool_is_always_local() {
        let pool = PeerPool::new(PEERS[0], PoolOptions::default()).unwrap();
        pool.set_peers(&[PEERS[0]]);

        assert!(pool.pick("Tom").is_none());
        assert_eq!(pool.owner("Tom").unwrap(), PEERS[0]);
    }

    #[test]
    fn test_set_peers_replaces_ring() {
        let pool = pool(PEERS[0]);
        assert_eq!(pool.peers().len(), 3);

        pool.set_peers(&["http://10.0.0.9:8001/"]);

        assert_eq!(pool.peers(), vec!["http://10.0.0.9:8001".to_string()]);
        assert_eq!(pool.pick("Tom").unwrap().address(), "http://10.0.0.9:8001");
    }

    #[test]
    fn test_self_addr_is_normalized() {
        let pool = PeerPool::new("http://127.0.0.1:8001/", PoolOptions::default()).unwrap();
        pool.set_peers(&[PEERS[0]]);

        assert_eq!(pool.self_addr(), PEERS[0]);
        assert!(pool.pick("anything").is_none());
    }
}

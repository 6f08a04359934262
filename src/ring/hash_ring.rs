//! Consistent Hash Ring
//!
//! Maps keys to peers through virtual nodes placed on a 32-bit ring.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Hash used to place virtual nodes and keys on the ring.
pub type HashFn = fn(&[u8]) -> u32;

/// Default hash: CRC-32 (IEEE).
pub fn default_hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// == Hash Ring ==
/// Deterministic key-to-peer mapping, stable under membership changes.
///
/// Each peer owns `virtual_nodes` positions on the ring, at
/// `hash("<i><peer>")` for `i` in `0..virtual_nodes`. A key belongs to the
/// first position clockwise from `hash(key)`.
///
/// The ring only grows. Removing a peer means building a new ring.
#[derive(Clone)]
pub struct HashRing {
    /// Places keys and virtual nodes on the ring
    hash: HashFn,
    /// Positions per peer
    virtual_nodes: usize,
    /// Ring positions, sorted ascending
    positions: Vec<u32>,
    /// Peer owning each position
    owners: HashMap<u32, String>,
    /// Distinct peers on the ring
    peers: BTreeSet<String>,
}

impl HashRing {
    // == Constructor ==
    /// Creates an empty ring using the default hash.
    pub fn new(virtual_nodes: usize) -> Self {
        Self::with_hash(virtual_nodes, default_hash)
    }

    /// Creates an empty ring with a custom hash function.
    pub fn with_hash(virtual_nodes: usize, hash: HashFn) -> Self {
        Self {
            hash,
            virtual_nodes,
            positions: Vec::new(),
            owners: HashMap::new(),
            peers: BTreeSet::new(),
        }
    }

    // == Add Peers ==
    /// Places the virtual nodes of every new peer on the ring.
    ///
    /// Peers already on the ring are skipped.
    pub fn add_peers<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            if !self.peers.insert(peer.to_string()) {
                continue;
            }
            for i in 0..self.virtual_nodes {
                let position = (self.hash)(format!("{}{}", i, peer).as_bytes());
                self.positions.push(position);
                self.owners.insert(position, peer.to_string());
            }
        }
        self.positions.sort_unstable();
    }

    // == Locate ==
    /// Returns the peer owning `key`, or `None` on an empty ring.
    pub fn locate(&self, key: &str) -> Option<&str> {
        if self.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&position| position < hash);
        let position = self.positions[idx % self.positions.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Peers on the ring, in sorted order.
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(String::as_str)
    }

    pub fn contains_peer(&self, peer: &str) -> bool {
        self.peers.contains(peer)
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("virtual_nodes", &self.virtual_nodes)
            .field("positions", &self.positions.len())
            .field("peers", &self.peers)
            .finish()
    }
}

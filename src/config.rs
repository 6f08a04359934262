//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::peers::{PoolOptions, DEFAULT_BASE_PATH, DEFAULT_VIRTUAL_NODES};

const DEFAULT_PEERS: &str = "http://127.0.0.1:8001,http://127.0.0.1:8002,http://127.0.0.1:8003";

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port of the peer endpoint
    pub server_port: u16,
    /// Base URL other peers reach this node at
    pub self_addr: String,
    /// Base URLs of every node in the cluster, this one included
    pub peers: Vec<String>,
    /// Port of the end-user API, disabled when `None`
    pub api_port: Option<u16>,
    /// Name of the demo namespace
    pub namespace: String,
    /// Namespace capacity in bytes (0 = unbounded)
    pub cache_bytes: usize,
    /// Path prefix of the peer endpoint
    pub base_path: String,
    /// Virtual nodes per peer on the hash ring
    pub virtual_nodes: usize,
    /// Timeout of a single peer request in milliseconds
    pub peer_timeout_ms: u64,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_peers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn local_addr(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Peer endpoint port (default: 8001)
    /// - `SELF_ADDR` - This node's base URL (default: `http://127.0.0.1:<SERVER_PORT>`)
    /// - `PEER_ADDRS` - Comma separated base URLs (default: ports 8001-8003 on localhost)
    /// - `API_PORT` - End-user API port (default: disabled)
    /// - `NAMESPACE` - Demo namespace name (default: scores)
    /// - `CACHE_BYTES` - Namespace capacity in bytes (default: 2048)
    /// - `BASE_PATH` - Peer endpoint path prefix (default: /_peercache/)
    /// - `VIRTUAL_NODES` - Virtual nodes per peer (default: 50)
    /// - `PEER_TIMEOUT_MS` - Peer request timeout (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let server_port = parse_var("SERVER_PORT").unwrap_or(defaults.server_port);

        Self {
            server_port,
            self_addr: env::var("SELF_ADDR").unwrap_or_else(|_| local_addr(server_port)),
            peers: env::var("PEER_ADDRS")
                .map(|list| split_peers(&list))
                .unwrap_or(defaults.peers),
            api_port: parse_var("API_PORT"),
            namespace: env::var("NAMESPACE").unwrap_or(defaults.namespace),
            cache_bytes: parse_var("CACHE_BYTES").unwrap_or(defaults.cache_bytes),
            base_path: env::var("BASE_PATH").unwrap_or(defaults.base_path),
            virtual_nodes: parse_var("VIRTUAL_NODES").unwrap_or(defaults.virtual_nodes),
            peer_timeout_ms: parse_var("PEER_TIMEOUT_MS").unwrap_or(defaults.peer_timeout_ms),
        }
    }

    /// Rejects settings the peer protocol cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(CacheError::InvalidConfig(format!(
                "BASE_PATH must start and end with '/', got {:?}",
                self.base_path
            )));
        }
        if self.virtual_nodes == 0 {
            return Err(CacheError::InvalidConfig(
                "VIRTUAL_NODES must be greater than 0".to_string(),
            ));
        }
        if self.self_addr.trim().is_empty() {
            return Err(CacheError::InvalidConfig("SELF_ADDR is empty".to_string()));
        }
        Ok(())
    }

    /// Peer pool tuning derived from this config.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            base_path: self.base_path.clone(),
            virtual_nodes: self.virtual_nodes,
            timeout: Duration::from_millis(self.peer_timeout_ms),
            ..PoolOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8001,
            self_addr: local_addr(8001),
            peers: split_peers(DEFAULT_PEERS),
            api_port: None,
            namespace: "scores".to_string(),
            cache_bytes: 2 << 10,
            base_path: DEFAULT_BASE_PATH.to_string(),
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            peer_timeout_ms: 2000,
        }
    }
}

//! HTTP Peer Client
//!
//! reqwest-based implementation of [`PeerClient`].

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::peers::PeerClient;

/// Characters left unescaped in a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// Percent-encodes one path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

// == HTTP Peer Client ==
/// Client for a single remote peer.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    /// Peer address, e.g. `http://10.0.0.2:8001`
    peer: String,
    /// `<peer><base_path>`
    base_url: String,
    /// Shared connection pool
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Creates a client for `peer`, e.g. `http://10.0.0.2:8001`, sharing the
    /// connection pool of `http`.
    pub fn new(peer: &str, base_path: &str, http: reqwest::Client) -> Self {
        Self {
            peer: peer.to_string(),
            base_url: format!("{}{}", peer, base_path),
            http,
        }
    }

    /// Full URL of `key` in `namespace` on this peer.
    pub fn url_for(&self, namespace: &str, key: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            encode_segment(namespace),
            encode_segment(key)
        )
    }

    fn failure(&self, reason: impl Into<String>) -> CacheError {
        CacheError::PeerFetchFailed {
            peer: self.peer.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Bytes> {
        let url = self.url_for(namespace, key);
        debug!(%url, "fetching from peer");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.failure(format!("server returned: {}", status)));
        }

        response
            .bytes()
            .await
            .map_err(|e| self.failure(format!("reading response body: {}", e)))
    }

    fn address(&self) -> &str {
        &self.peer
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("Tom"), "Tom");
        assert_eq!(encode_segment("a b"), "a%20b");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("user:1?x=2"), "user%3A1%3Fx%3D2");
        assert_eq!(encode_segment("k-_~"), "k-_~");
    }

    #[test]
    fn test_url_for() {
        let client = HttpPeerClient::new(
            "http://127.0.0.1:8002",
            "/_peercache/",
            reqwest::Client::new(),
        );

        assert_eq!(
            client.url_for("scores", "Tom"),
            "http://127.0.0.1:8002/_peercache/scores/Tom"
        );
        assert_eq!(
            client.url_for("my ns", "a/b"),
            "http://127.0.0.1:8002/_peercache/my%20ns/a%2Fb"
        );
    }

    #[tokio::test]
    async fn test_fetch_unreachable_peer() {
        // port 1 is reserved and nothing listens there
        let client = HttpPeerClient::new("http://127.0.0.1:1", "/_peercache/", reqwest::Client::new());

        let err = client.fetch("scores", "Tom").await.unwrap_err();

        assert!(matches!(
            err,
            CacheError::PeerFetchFailed { ref peer, .. } if peer == "http://127.0.0.1:1"
        ));
    }
}

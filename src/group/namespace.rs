//! Namespace Module
//!
//! A named read-through cache: local store first, then the owning peer, then
//! the origin loader.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::{BoundedStore, ByteView, CacheStats, EvictionHook};
use crate::error::{CacheError, Result};
use crate::flight::RequestCoalescer;
use crate::group::stats::{incr, NamespaceStats, NamespaceStatsSnapshot};
use crate::group::Loader;
use crate::peers::{PeerClient, PeerLocator};

// == Namespace ==
/// A cache namespace with its own bounded store and loader.
///
/// Lookup order for a key:
/// 1. the local store;
/// 2. on a miss, one coalesced load per key: the owning remote peer if a
///    locator is attached and picks one, otherwise (or if the peer fails)
///    the loader;
/// 3. values from the loader are stored locally, values from a peer are not.
///
/// A coalesced load runs on its own task and completes even if every caller
/// waiting on it goes away, so its value still lands in the store.
pub struct Namespace {
    /// State the detached loads work on
    shared: Arc<Shared>,
    /// In-flight loads by key
    flight: RequestCoalescer<Result<ByteView>>,
}

struct Shared {
    /// Namespace name, sent to peers
    name: String,
    /// Origin data source
    loader: Arc<dyn Loader>,
    /// Locally owned values
    store: Mutex<BoundedStore>,
    /// Routes misses to their owning peer, if attached
    peers: RwLock<Option<Arc<dyn PeerLocator>>>,
    /// Lookup counters
    stats: NamespaceStats,
}

impl Namespace {
    // == Constructor ==
    /// Creates a namespace holding up to `capacity_bytes` (0 = unbounded).
    pub fn new(
        name: impl Into<String>,
        capacity_bytes: usize,
        loader: impl Loader + 'static,
    ) -> Self {
        Self::from_parts(
            name.into(),
            Arc::new(loader),
            BoundedStore::new(capacity_bytes),
            None,
        )
    }

    /// Starts a builder for namespaces that need more than a loader.
    pub fn builder(name: impl Into<String>) -> NamespaceBuilder {
        NamespaceBuilder::new(name)
    }

    fn from_parts(
        name: String,
        loader: Arc<dyn Loader>,
        store: BoundedStore,
        peers: Option<Arc<dyn PeerLocator>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                loader,
                store: Mutex::new(store),
                peers: RwLock::new(peers),
                stats: NamespaceStats::default(),
            }),
            flight: RequestCoalescer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // == Register Peers ==
    /// Attaches the locator used to route misses to their owning peer.
    /// A previously attached locator is replaced.
    pub fn register_peers(&self, locator: Arc<dyn PeerLocator>) {
        if self.shared.peers.write().replace(locator).is_some() {
            warn!(namespace = %self.shared.name, "peer locator replaced");
        }
    }

    // == Get ==
    /// Returns the value for `key`.
    ///
    /// Only [`CacheError::EmptyKey`] and [`CacheError::LoadFailed`] are ever
    /// returned; peer failures fall back to the loader.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        let shared = &self.shared;
        incr(&shared.stats.gets);

        let cached = shared.store.lock().get(key);
        if let Some(value) = cached {
            incr(&shared.stats.cache_hits);
            debug!(namespace = %shared.name, key, "cache hit");
            return Ok(value);
        }

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        incr(&self.shared.stats.loads);

        let shared = self.shared.clone();
        let owned_key = key.to_string();
        self.flight
            .execute(key, move || {
                let shared = shared.clone();
                let key = owned_key.clone();
                async move { shared.load_uncached(&key).await }
            })
            .await
    }

    /// Counts a lookup that arrived from another peer.
    pub fn record_server_request(&self) {
        incr(&self.shared.stats.server_requests);
    }

    pub fn stats(&self) -> NamespaceStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Statistics of the local store.
    pub fn cache_stats(&self) -> CacheStats {
        self.shared.store.lock().stats()
    }

    /// Whether `key` is held by the local store. Does not affect recency.
    pub fn is_cached(&self, key: &str) -> bool {
        self.shared.store.lock().contains(key)
    }
}

impl Shared {
    /// Body of one coalesced load.
    async fn load_uncached(&self, key: &str) -> Result<ByteView> {
        incr(&self.stats.loads_deduped);

        // An earlier flight may have filled the store after our miss.
        let cached = self.store.lock().peek(key).cloned();
        if let Some(value) = cached {
            return Ok(value);
        }

        if let Some(peer) = self.pick_peer(key) {
            match self.get_from_peer(peer.as_ref(), key).await {
                Ok(value) => {
                    incr(&self.stats.peer_loads);
                    return Ok(value);
                }
                Err(err) => {
                    incr(&self.stats.peer_errors);
                    warn!(
                        namespace = %self.name,
                        key,
                        peer = peer.address(),
                        error = %err,
                        "peer fetch failed, loading locally"
                    );
                }
            }
        }

        self.get_locally(key).await
    }

    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        self.peers.read().as_ref().and_then(|locator| locator.pick(key))
    }

    async fn get_from_peer(&self, peer: &dyn PeerClient, key: &str) -> Result<ByteView> {
        let bytes = peer.fetch(&self.name, key).await?;
        Ok(ByteView::from(bytes))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        match self.loader.load(key).await {
            Ok(data) => {
                incr(&self.stats.local_loads);
                // the loader gave up ownership, nothing else can reach these bytes
                let value = ByteView::from(data);
                self.populate(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                incr(&self.stats.local_load_errors);
                Err(CacheError::load_failed(key, &err))
            }
        }
    }

    fn populate(&self, key: &str, value: ByteView) {
        self.store.lock().add(key, value);
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.shared.name)
            .field("store", &*self.shared.store.lock())
            .field("has_peers", &self.shared.peers.read().is_some())
            .field("flight", &self.flight)
            .finish()
    }
}

// == Namespace Builder ==
/// Builds a [`Namespace`] with optional eviction hook and peers.
pub struct NamespaceBuilder {
    /// Namespace name
    name: String,
    /// Store capacity, 0 = unbounded
    capacity_bytes: usize,
    /// Required origin loader
    loader: Option<Arc<dyn Loader>>,
    /// Optional eviction callback
    on_evicted: Option<EvictionHook>,
    /// Optional peer locator
    peers: Option<Arc<dyn PeerLocator>>,
}

impl NamespaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity_bytes: 0,
            loader: None,
            on_evicted: None,
            peers: None,
        }
    }

    /// Store capacity in bytes, 0 (the default) = unbounded.
    pub fn capacity_bytes(mut self, capacity_bytes: usize) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Uses a loader shared with other namespaces.
    pub fn shared_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Called synchronously with every evicted entry.
    pub fn on_evicted<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &ByteView) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(hook));
        self
    }

    pub fn peers(mut self, locator: Arc<dyn PeerLocator>) -> Self {
        self.peers = Some(locator);
        self
    }

    /// Fails with [`CacheError::NilLoader`] when no loader was given.
    pub fn build(self) -> Result<Namespace> {
        let loader = self.loader.ok_or_else(|| CacheError::NilLoader(self.name.clone()))?;
        let store = match self.on_evicted {
            Some(hook) => BoundedStore::with_eviction_hook(self.capacity_bytes, hook),
            None => BoundedStore::new(self.capacity_bytes),
        };
        Ok(Namespace::from_parts(self.name, loader, store, self.peers))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::loader_fn;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Loader over the demo score table that counts its calls.
    fn scores_loader(calls: Arc<AtomicUsize>) -> impl Loader {
        loader_fn(move |key: String| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                match key.as_str() {
                    "Tom" => Ok(b"630".to_vec()),
                    "Jack" => Ok(b"589".to_vec()),
                    "Sam" => Ok(b"567".to_vec()),
                    _ => anyhow::bail!("{} not exist", key),
                }
            }
        })
    }

    struct FailingPeer;

    #[async_trait]
    impl PeerClient for FailingPeer {
        async fn fetch(&self, _namespace: &str, _key: &str) -> Result<Bytes> {
            Err(CacheError::PeerFetchFailed {
                peer: "fake".into(),
                reason: "connection refused".into(),
            })
        }

        fn address(&self) -> &str {
            "fake"
        }
    }

    struct EchoPeer;

    #[async_trait]
    impl PeerClient for EchoPeer {
        async fn fetch(&self, namespace: &str, key: &str) -> Result<Bytes> {
            Ok(Bytes::from(format!("{}:{}", namespace, key)))
        }

        fn address(&self) -> &str {
            "echo"
        }
    }

    /// Locator that always hands out the same peer.
    struct FixedLocator(Arc<dyn PeerClient>);

    impl PeerLocator for FixedLocator {
        fn pick(&self, _key: &str) -> Option<Arc<dyn PeerClient>> {
            Some(self.0.clone())
        }
    }

    struct NoPeer;

    impl PeerLocator for NoPeer {
        fn pick(&self, _key: &str) -> Option<Arc<dyn PeerClient>> {
            None
        }
    }

    #[tokio::test]
    async fn test_scores_scenario() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));

        let value = scores.get("Tom").await.unwrap();
        assert_eq!(value.as_slice(), b"630");
        let stats = scores.cache_stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.used_bytes, 6);

        let err = scores.get("Unknown").await.unwrap_err();
        assert!(matches!(err, CacheError::LoadFailed { ref key, .. } if key == "Unknown"));
        assert_eq!(scores.cache_stats().entries, 1);

        let before = calls.load(Ordering::SeqCst);
        assert_eq!(scores.get("").await.unwrap_err(), CacheError::EmptyKey);
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_second_get_is_a_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));

        for _ in 0..5 {
            assert_eq!(scores.get("Jack").await.unwrap().to_string(), "589");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = scores.stats();
        assert_eq!(stats.gets, 5);
        assert_eq!(stats.cache_hits, 4);
        assert_eq!(stats.local_loads, 1);
    }

    #[tokio::test]
    async fn test_load_errors_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));

        assert!(scores.get("Nobody").await.is_err());
        assert!(scores.get("Nobody").await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scores.stats().local_load_errors, 2);
    }

    #[tokio::test]
    async fn test_failing_peer_falls_back_to_loader() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));
        scores.register_peers(Arc::new(FixedLocator(Arc::new(FailingPeer))));

        let value = scores.get("Tom").await.unwrap();

        assert_eq!(value.as_slice(), b"630");
        assert!(scores.is_cached("Tom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = scores.stats();
        assert_eq!(stats.peer_errors, 1);
        assert_eq!(stats.peer_loads, 0);
    }

    #[tokio::test]
    async fn test_peer_values_are_not_cached_locally() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));
        scores.register_peers(Arc::new(FixedLocator(Arc::new(EchoPeer))));

        let value = scores.get("Tom").await.unwrap();

        assert_eq!(value.to_string(), "scores:Tom");
        assert!(!scores.is_cached("Tom"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scores.stats().peer_loads, 1);
    }

    #[tokio::test]
    async fn test_locally_owned_keys_use_loader() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::new("scores", 2048, scores_loader(calls.clone()));
        scores.register_peers(Arc::new(NoPeer));

        assert_eq!(scores.get("Sam").await.unwrap().to_string(), "567");
        assert!(scores.is_cached("Sam"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_load_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slow = loader_fn(move |key: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, anyhow::Error>(format!("value-of-{}", key).into_bytes())
            }
        });
        let namespace = Arc::new(Namespace::new("slow", 0, slow));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let namespace = namespace.clone();
            handles.push(tokio::spawn(async move { namespace.get("hot").await }));
        }

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            assert_eq!(value.to_string(), "value-of-hot");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(namespace.stats().gets, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_aborted_caller_does_not_cancel_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slow = loader_fn(move |key: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, anyhow::Error>(key.into_bytes())
            }
        });
        let namespace = Arc::new(Namespace::new("slow", 0, slow));

        let first = {
            let namespace = namespace.clone();
            tokio::spawn(async move { namespace.get("hot").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = {
            let namespace = namespace.clone();
            tokio::spawn(async move { namespace.get("hot").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        first.abort();

        assert_eq!(second.await.unwrap().unwrap().to_string(), "hot");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(namespace.is_cached("hot"));
    }

    #[tokio::test]
    async fn test_load_completes_after_only_caller_times_out() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slow = loader_fn(move |key: String| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, anyhow::Error>(key.into_bytes())
            }
        });
        let namespace = Namespace::new("slow", 0, slow);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), namespace.get("hot")).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(namespace.is_cached("hot"));
        assert_eq!(namespace.get("hot").await.unwrap().to_string(), "hot");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_builder_requires_loader() {
        let err = Namespace::builder("empty").capacity_bytes(10).build().unwrap_err();
        assert_eq!(err, CacheError::NilLoader("empty".to_string()));
    }

    #[tokio::test]
    async fn test_builder_eviction_hook() {
        let evicted = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let scores = Namespace::builder("scores")
            .capacity_bytes(13)
            .loader(scores_loader(calls))
            .on_evicted(move |key, _| sink.lock().push(key.to_string()))
            .build()
            .unwrap();

        scores.get("Tom").await.unwrap();
        scores.get("Sam").await.unwrap();
        scores.get("Jack").await.unwrap();

        assert_eq!(*evicted.lock(), vec!["Tom".to_string()]);
        assert!(!scores.is_cached("Tom"));
        assert!(scores.is_cached("Jack"));
    }
}

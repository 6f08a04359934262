//! Loader Module
//!
//! The origin data source consulted on a cache miss.

use std::future::Future;

use async_trait::async_trait;

// == Loader ==
/// Loads the value for a key from the origin.
///
/// Called concurrently for different keys, and at most once per key for each
/// window of coalesced misses.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}

// == Loader Fn ==
/// Adapts an async closure into a [`Loader`].
pub struct LoaderFn<F>(F);

/// Wraps `f` as a loader.
///
/// ```ignore
/// let loader = loader_fn(|key: String| async move {
///     db.lookup(&key).await.context("querying db")
/// });
/// ```
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    LoaderFn(f)
}

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    async fn load(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        (self.0)(key.to_string()).await
    }
}

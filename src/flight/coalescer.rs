//! Request Coalescer
//!
//! Collapses concurrent work for the same key into a single execution.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Receiving side of one in-flight call. `None` until the work publishes.
type Pending<T> = watch::Receiver<Option<T>>;

/// In-flight calls by key.
type FlightTable<T> = Mutex<HashMap<String, Pending<T>>>;

// == Request Coalescer ==
/// Deduplicates concurrent executions of work identified by a key.
///
/// The first caller for a key starts the work on its own task; every caller
/// for that key, the first one included, waits for the result and receives a
/// clone of it. The task removes the key from the in-flight table in the same
/// critical section that publishes the result, so a call arriving afterwards
/// always starts fresh work.
///
/// Dropping a caller never cancels the work: it runs to completion and its
/// result is published to whoever is still waiting. Only a panic inside the
/// work releases the waiters early, and they retry.
pub struct RequestCoalescer<T> {
    /// Calls in flight, shared with their running tasks
    in_flight: Arc<FlightTable<T>>,
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Execute ==
    /// Runs `work` unless a call for `key` is already in flight, in which case
    /// the result of that call is returned instead.
    ///
    /// `work` is called once per started execution; it is only called again
    /// if an earlier execution panicked. Must be called within a tokio
    /// runtime.
    pub async fn execute<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        loop {
            let mut pending = self.join_or_start(key, &work);
            let published = pending
                .wait_for(Option::is_some)
                .await
                .map(|published| Option::clone(&published));
            if let Ok(Some(value)) = published {
                return value;
            }
            debug!(key, "in-flight call panicked, retrying");
        }
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn join_or_start<F, Fut>(&self, key: &str, work: &F) -> Pending<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let sender = {
            let mut in_flight = self.in_flight.lock();
            if let Some(pending) = in_flight.get(key) {
                debug!(key, "joining in-flight call");
                return pending.clone();
            }
            let (sender, pending) = watch::channel(None);
            in_flight.insert(key.to_string(), pending);
            sender
        };
        let pending = sender.subscribe();

        let mut flight = Flight {
            in_flight: self.in_flight.clone(),
            key: key.to_string(),
            sender: Some(sender),
        };
        let work = work();
        tokio::spawn(async move {
            let value = work.await;
            flight.publish(value);
        });
        pending
    }
}

impl<T> fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

// == Flight ==
/// The running task's handle on its in-flight entry.
///
/// While the task is alive the table entry for its key is its own, so
/// removal by key is safe.
struct Flight<T> {
    /// Table the entry lives in
    in_flight: Arc<FlightTable<T>>,
    /// Key of the entry
    key: String,
    /// Taken on publish
    sender: Option<watch::Sender<Option<T>>>,
}

impl<T> Flight<T> {
    fn publish(&mut self, value: T) {
        let mut in_flight = self.in_flight.lock();
        in_flight.remove(&self.key);
        if let Some(sender) = self.sender.take() {
            sender.send_replace(Some(value));
        }
    }
}

impl<T> Drop for Flight<T> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            // The work panicked or the runtime shut down. Dropping the sender
            // wakes the waiters with an error and they retry.
            self.in_flight.lock().remove(&self.key);
            self.sender = None;
        }
    }
}

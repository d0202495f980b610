use crate::errors::SearchError;
use crate::types::{AggregateResult, SearchQuery};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Terminal outcome of one single-flight fetch, shared with every waiter.
type FetchOutcome = Result<Arc<AggregateResult>, SearchError>;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    result: Arc<AggregateResult>,
    expires_at: Instant,
}

/// Both maps live under one lock: the cached/inflight decision for a key has
/// to be atomic.
struct State {
    entries: HashMap<String, CacheEntry>,
    inflight: HashMap<String, watch::Receiver<Option<FetchOutcome>>>,
}

struct Shared {
    state: Mutex<State>,
    ttl: Duration,
}

impl Shared {
    fn remove_expired(&self) {
        let now = Instant::now();
        self.state.lock().entries.retain(|_, entry| entry.expires_at > now);
    }
}

/// In-memory result cache with TTL and request collapsing: concurrent calls
/// for the same key share one fetch.
///
/// A background sweeper reclaims expired entries; it stops when the cache is
/// dropped. Expired entries found during a read are treated as absent either
/// way, so the sweeper is a liveness improvement only.
pub struct SearchCache {
    shared: Arc<Shared>,
    // Dropping the sender stops the sweeper task.
    _shutdown: watch::Sender<bool>,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                entries: HashMap::new(),
                inflight: HashMap::new(),
            }),
            ttl,
        });
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let sweeper = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweeper.remove_expired(),
                    _ = shutdown_rx.changed() => return,
                }
            }
        });

        Self {
            shared,
            _shutdown: shutdown,
        }
    }

    /// Cache key for a validated query.
    pub fn key(query: &SearchQuery) -> String {
        format!(
            "{}:{}:{}:{}",
            query.city, query.checkin, query.nights, query.adults
        )
    }

    /// Returns the cached result for `key`, or runs `fetch` to produce it.
    ///
    /// Concurrent callers for the same key are collapsed onto one fetch and
    /// all observe the same terminal outcome; the flag is `true` only for a
    /// cache hit. The fetch runs on its own task, so a caller that goes away
    /// mid-wait cannot tear down the shared computation. Errors are never
    /// stored; the next caller after a failure starts a fresh fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<(Arc<AggregateResult>, bool), SearchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AggregateResult, SearchError>> + Send + 'static,
    {
        let mut rx = {
            let mut state = self.shared.state.lock();

            if let Some(entry) = state.entries.get(key)
                && entry.expires_at > Instant::now()
            {
                return Ok((Arc::clone(&entry.result), true));
            }

            if let Some(rx) = state.inflight.get(key) {
                // Join the fetch already in flight as a waiter.
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                state.inflight.insert(key.to_string(), rx.clone());
                drop(state);

                let guard = InflightGuard {
                    shared: Arc::clone(&self.shared),
                    key: key.to_string(),
                    tx: Some(tx),
                };
                let fut = fetch();
                tokio::spawn(async move {
                    let outcome = fut.await.map(Arc::new);
                    guard.complete(outcome);
                });

                rx
            }
        };

        let outcome = match rx.wait_for(|slot| slot.is_some()).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(Ok(result)) => Ok((result, false)),
            Some(Err(err)) => Err(err),
            // The fetch task went away without recording an outcome.
            None => Err(SearchError::FetchAbandoned),
        }
    }

    /// Removes one key from the cache.
    pub fn invalidate(&self, key: &str) {
        self.shared.state.lock().entries.remove(key);
    }

    /// Removes every cached entry.
    pub fn clear(&self) {
        self.shared.state.lock().entries.clear();
    }

    #[cfg(test)]
    fn sweep_now(&self) {
        self.shared.remove_expired();
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.shared.state.lock().entries.len()
    }
}

/// Publishes the fetch outcome: store on success, drop the inflight slot,
/// wake the waiters. If the fetch task dies first, `Drop` clears the inflight
/// slot so the key is not wedged; the closed channel tells waiters the fetch
/// was abandoned.
struct InflightGuard {
    shared: Arc<Shared>,
    key: String,
    tx: Option<watch::Sender<Option<FetchOutcome>>>,
}

impl InflightGuard {
    fn complete(mut self, outcome: FetchOutcome) {
        let Some(tx) = self.tx.take() else { return };

        let mut state = self.shared.state.lock();
        if let Ok(result) = &outcome {
            state.entries.insert(
                self.key.clone(),
                CacheEntry {
                    result: Arc::clone(result),
                    expires_at: Instant::now() + self.shared.ttl,
                },
            );
        }
        state.inflight.remove(&self.key);
        drop(state);

        let _ = tx.send(Some(outcome));
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.shared.state.lock().inflight.remove(&self.key);
        }
    }
}

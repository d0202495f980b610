use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

struct Bucket {
    tokens: u32,
    window_start: Instant,
}

struct Shared {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate: u32,
    window: Duration,
}

impl Shared {
    /// Buckets idle for longer than two windows are reclaimed.
    fn reap_stale(&self) {
        let now = Instant::now();
        self.buckets
            .lock()
            .retain(|_, bucket| now.duration_since(bucket.window_start) <= self.window * 2);
    }
}

/// Fixed-window token bucket limiter, one bucket per client key.
///
/// A background sweeper bounds memory against one-shot clients; it stops when
/// the limiter is dropped.
pub struct RateLimiter {
    shared: Arc<Shared>,
    // Dropping the sender stops the sweeper task.
    _shutdown: watch::Sender<bool>,
}

impl RateLimiter {
    /// `rate` tokens per `window` per key. A rate of zero denies everything.
    pub fn new(rate: u32, window: Duration) -> Self {
        let shared = Arc::new(Shared {
            buckets: Mutex::new(HashMap::new()),
            rate,
            window,
        });
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let sweeper = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.window * 5);
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweeper.reap_stale(),
                    _ = shutdown_rx.changed() => return,
                }
            }
        });

        Self {
            shared,
            _shutdown: shutdown,
        }
    }

    /// True iff the caller may proceed; consumes one token.
    pub fn allow(&self, key: &str) -> bool {
        let rate = self.shared.rate;
        let mut buckets = self.shared.buckets.lock();
        let now = Instant::now();

        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: rate,
            window_start: now,
        });

        // Lazy reset once the window has passed
        if now.duration_since(bucket.window_start) >= self.shared.window {
            bucket.tokens = rate;
            bucket.window_start = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn reap_now(&self) {
        self.shared.reap_stale();
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.shared.buckets.lock().len()
    }
}

//! Per-key coalescing of concurrent refreshes.
//!
//! The first caller for a key becomes the leader and runs the work; callers
//! arriving while it is in flight subscribe and receive a clone of its result.
//! If the leader is cancelled before finishing, waiters run the work themselves.

use std::future::Future;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct InflightRequests<T: Clone> {
    pending: DashMap<String, broadcast::Sender<T>>,
}

impl<T: Clone> Default for InflightRequests<T> {
    fn default() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }
}

/// Clears the leader's slot if its future is dropped before completing.
struct LeaderSlot<'a, T: Clone> {
    pending: &'a DashMap<String, broadcast::Sender<T>>,
    key: &'a str,
    armed: bool,
}

impl<T: Clone> Drop for LeaderSlot<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.remove(self.key);
        }
    }
}

impl<T: Clone> InflightRequests<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a refresh currently in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Runs `work` for `key` unless a run is already in flight, in which case
    /// its result is awaited instead.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let waiter = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => Some(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx);
                None
            }
        };

        if let Some(mut rx) = waiter {
            return match rx.recv().await {
                Ok(value) => value,
                Err(_) => {
                    tracing::debug!(key, "In-flight leader went away, running locally");
                    work().await
                }
            };
        }

        let mut slot = LeaderSlot {
            pending: &self.pending,
            key,
            armed: true,
        };
        let value = work().await;
        slot.armed = false;

        if let Some((_, tx)) = self.pending.remove(key) {
            // No receivers is fine: nobody else asked while we were fetching
            let _ = tx.send(value.clone());
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let inflight = Arc::new(InflightRequests::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let inflight = inflight.clone();
            let runs = runs.clone();
            let mut release_rx = release_rx.clone();
            handles.push(tokio::spawn(async move {
                inflight
                    .run("Paris", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.wait_for(|released| *released).await;
                        42
                    })
                    .await
            }));
        }

        // Let every task register before the leader finishes
        tokio::time::sleep(Duration::from_millis(50)).await;
        release_tx.send(true).unwrap();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let inflight = InflightRequests::<String>::new();
        let a = inflight.run("Paris", || async { "a".to_string() }).await;
        let b = inflight.run("paris", || async { "b".to_string() }).await;
        assert_eq!((a.as_str(), b.as_str()), ("a", "b"));
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_leader_releases_key() {
        let inflight = Arc::new(InflightRequests::<u32>::new());

        let leader = {
            let inflight = inflight.clone();
            tokio::spawn(async move {
                inflight
                    .run("Oslo", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(inflight.len(), 1);

        leader.abort();
        let _ = leader.await;
        assert!(inflight.is_empty());

        let value = inflight.run("Oslo", || async { 2 }).await;
        assert_eq!(value, 2);
    }
}

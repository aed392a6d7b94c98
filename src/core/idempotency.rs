//! Run-once-per-token cache for idempotent requests
//!
//! Each client token maps to a single-assignment cell. The first caller for a
//! token runs the work; every concurrent or later caller with the same token
//! awaits that cell and receives a clone of the same outcome, success or
//! error. [`IdempotencyCache::forget`] drops the cell so the token can start a
//! fresh attempt.
//!
//! Waiting has no timeout of its own. If the caller running the work is
//! dropped mid-flight, one of the waiters picks the work up instead.
//!
//! Entries are never dropped on their own. A failed outcome stays cached
//! until its token is forgotten, so the map grows with every distinct token
//! that fails and is never retried.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Token-keyed cache of shared outcomes
#[derive(Debug)]
pub struct IdempotencyCache<T> {
    calls: DashMap<String, Arc<OnceCell<T>>>,
}

impl<T> Default for IdempotencyCache<T> {
    fn default() -> Self {
        Self {
            calls: DashMap::new(),
        }
    }
}

impl<T: Clone> IdempotencyCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` at most once for `token` and share its outcome
    pub async fn once<F, Fut>(&self, token: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // The map guard is released at the end of this statement, before awaiting.
        let cell = Arc::clone(
            self.calls
                .entry(token.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );
        cell.get_or_init(work).await.clone()
    }

    /// Forget the outcome recorded for `token`
    ///
    /// Returns whether an entry was present.
    pub fn forget(&self, token: &str) -> bool {
        self.calls.remove(token).is_some()
    }

    /// Forget `token` only if its completed outcome satisfies `pred`
    ///
    /// An attempt still in flight is never removed.
    pub fn forget_if(&self, token: &str, pred: impl FnOnce(&T) -> bool) -> bool {
        self.calls
            .remove_if(token, |_, cell| cell.get().is_some_and(pred))
            .is_some()
    }

    /// Whether `token` currently has an entry (in flight or completed)
    pub fn contains(&self, token: &str) -> bool {
        self.calls.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_run() {
        let cache = Arc::new(IdempotencyCache::<Result<u32, String>>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut tasks = vec![];
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let runs = Arc::clone(&runs);
            tasks.push(tokio::spawn(async move {
                cache
                    .once("tok", || async {
                        let n = runs.fetch_add(1, Ordering::SeqCst) as u32;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(n + 100)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(100));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_shared_until_forgotten() {
        let cache = IdempotencyCache::<Result<u32, String>>::new();

        let first = cache.once("tok", || async { Err("boom".to_string()) }).await;
        let second = cache.once("tok", || async { Ok(1) }).await;
        assert_eq!(first, Err("boom".to_string()));
        assert_eq!(second, Err("boom".to_string()));
        assert_eq!(cache.len(), 1);

        assert!(cache.forget("tok"));
        let third = cache.once("tok", || async { Ok(1) }).await;
        assert_eq!(third, Ok(1));
    }

    #[tokio::test]
    async fn test_tokens_are_independent() {
        let cache = IdempotencyCache::<u32>::new();

        assert_eq!(cache.once("a", || async { 1 }).await, 1);
        assert_eq!(cache.once("b", || async { 2 }).await, 2);
        assert_eq!(cache.once("a", || async { 3 }).await, 1);
        assert_eq!(cache.len(), 2);

        assert!(!cache.forget("missing"));
        assert!(cache.forget("a"));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[tokio::test]
    async fn test_forget_if_checks_the_outcome() {
        let cache = IdempotencyCache::<Result<u32, String>>::new();
        cache.once("tok", || async { Ok(7) }).await;

        assert!(!cache.forget_if("tok", |outcome| *outcome == Ok(8)));
        assert!(cache.contains("tok"));
        assert!(!cache.forget_if("missing", |_| true));

        assert!(cache.forget_if("tok", |outcome| *outcome == Ok(7)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_forget_if_leaves_in_flight_attempt() {
        let cache = Arc::new(IdempotencyCache::<u32>::new());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (finish_tx, finish_rx) = tokio::sync::oneshot::channel::<()>();

        let runner = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .once("tok", || async move {
                        let _ = started_tx.send(());
                        let _ = finish_rx.await;
                        5
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert!(!cache.forget_if("tok", |_| true));
        assert!(cache.contains("tok"));

        finish_tx.send(()).unwrap();
        assert_eq!(runner.await.unwrap(), 5);
    }
}

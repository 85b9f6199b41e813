//! Cross-loader request coalescing.
//!
//! Loaders never share state on their own. Wrapping one fetcher in a
//! [`CoalescingFetcher`] and handing clones of it to several loaders makes concurrent
//! fetches of an equal query share a single underlying request.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::FetchError;
use crate::fetcher::Fetcher;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// Deduplicates concurrent identical fetches. Cheap to clone; clones share the in-flight map.
pub struct CoalescingFetcher<Q, T> {
    inner: Arc<dyn Fetcher<Q, T>>,
    in_flight: Arc<DashMap<Q, SharedFetch<T>>>,
}

impl<Q, T> Clone for CoalescingFetcher<Q, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<Q, T> CoalescingFetcher<Q, T>
where
    Q: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(inner: F) -> Self
    where
        F: Fetcher<Q, T> + 'static,
    {
        Self {
            inner: Arc::new(inner),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Number of distinct queries with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn join_or_start(&self, query: &Q) -> SharedFetch<T> {
        match self.in_flight.entry(query.clone()) {
            Entry::Occupied(e) => {
                tracing::debug!(query = ?query, "joining in-flight request");
                e.get().clone()
            }
            Entry::Vacant(e) => {
                let inner = Arc::clone(&self.inner);
                let owned = query.clone();
                let fetch = async move { inner.fetch(&owned).await }.boxed().shared();
                e.insert(fetch.clone());
                fetch
            }
        }
    }
}

/// One caller's hold on a shared request. Dropping it, on completion or because the
/// caller's task was aborted, removes the map entry once the request is finished or no
/// other caller is left waiting on it.
struct Waiter<Q, T>
where
    Q: Eq + Hash,
    T: Clone,
{
    in_flight: Arc<DashMap<Q, SharedFetch<T>>>,
    query: Q,
    fetch: SharedFetch<T>,
}

impl<Q, T> Drop for Waiter<Q, T>
where
    Q: Eq + Hash,
    T: Clone,
{
    fn drop(&mut self) {
        // A live entry counts the map's copy plus ours.
        let mine = &self.fetch;
        self.in_flight.remove_if(&self.query, |_, pending| {
            pending.peek().is_some()
                || (Shared::ptr_eq(mine, pending) && pending.strong_count() == Some(2))
        });
    }
}

#[async_trait]
impl<Q, T> Fetcher<Q, T> for CoalescingFetcher<Q, T>
where
    Q: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    async fn fetch(&self, query: &Q) -> Result<T, FetchError> {
        let mut waiter = Waiter {
            in_flight: Arc::clone(&self.in_flight),
            query: query.clone(),
            fetch: self.join_or_start(query),
        };
        (&mut waiter.fetch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fetcher_fn;
    use crate::loader::Loader;
    use crate::state::LoadState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_equal_queries_share_one_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher = CoalescingFetcher::new(fetcher_fn(move |q: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, FetchError>(q.to_uppercase())
            }
        }));

        let q = "collection".to_string();
        let other = fetcher.clone();
        let (a, b) = tokio::join!(fetcher.fetch(&q), other.fetch(&q));
        assert_eq!(a, Ok("COLLECTION".to_string()));
        assert_eq!(b, Ok("COLLECTION".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn sequential_fetches_are_not_coalesced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher = CoalescingFetcher::new(fetcher_fn(move |_: u32| {
            let counter = Arc::clone(&counter);
            async move { Ok::<_, FetchError>(counter.fetch_add(1, Ordering::SeqCst)) }
        }));

        assert_eq!(fetcher.fetch(&1).await, Ok(0));
        assert_eq!(fetcher.fetch(&1).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_request_leaves_the_map() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher = CoalescingFetcher::new(fetcher_fn(move |q: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if q == "slow" {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Ok::<_, FetchError>(q.len())
            }
        }));
        let loader = Loader::builder(fetcher.clone())
            .abort_superseded(true)
            .build();

        loader.initialize("slow".to_string());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fetcher.in_flight(), 1);
        loader.set_query("fast".to_string());
        let snap = loader.settled().await.unwrap();
        assert_eq!(snap.state, LoadState::Loaded(4));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fetcher.in_flight(), 0);

        let again = tokio::time::timeout(
            Duration::from_millis(20),
            fetcher.fetch(&"slow".to_string()),
        )
        .await;
        assert!(again.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn remaining_waiter_keeps_the_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher = CoalescingFetcher::new(fetcher_fn(move |_: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, FetchError>(7)
            }
        }));

        let kept = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&1).await }
        });
        let dropped = tokio::spawn({
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(&1).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        dropped.abort();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fetcher.in_flight(), 1);

        assert_eq!(kept.await.unwrap(), Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn errors_are_shared_too() {
        let fetcher = CoalescingFetcher::new(fetcher_fn(|_: u32| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>(FetchError::new("network error"))
        }));
        let (a, b) = tokio::join!(fetcher.fetch(&7), fetcher.fetch(&7));
        assert_eq!(a, b);
        assert_eq!(a.unwrap_err().message(), "network error");
    }
}

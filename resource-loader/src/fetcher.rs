//! Fetcher: the async data source a loader pulls from.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;

/// Produces the payload for a query. Opaque to the loader; implement for an API client,
/// a database call, or wrap a closure with [`fetcher_fn`].
#[async_trait]
pub trait Fetcher<Q, T>: Send + Sync {
    async fn fetch(&self, query: &Q) -> Result<T, FetchError>;
}

#[async_trait]
impl<Q, T, F> Fetcher<Q, T> for Arc<F>
where
    Q: Send + Sync,
    F: Fetcher<Q, T> + ?Sized,
{
    async fn fetch(&self, query: &Q) -> Result<T, FetchError> {
        (**self).fetch(query).await
    }
}

/// A [`Fetcher`] backed by a closure returning a future.
pub struct FnFetcher<F> {
    f: F,
}

/// Wraps `f` so that `f(query.clone())` is awaited for every fetch.
///
/// ```rust,ignore
/// let fetcher = fetcher_fn(|q: Query| async move { api.list(q.endpoint()).await });
/// ```
pub fn fetcher_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<Q, T, F, Fut> Fetcher<Q, T> for FnFetcher<F>
where
    Q: Clone + Send + Sync + 'static,
    F: Fn(Q) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    async fn fetch(&self, query: &Q) -> Result<T, FetchError> {
        (self.f)(query.clone()).await
    }
}

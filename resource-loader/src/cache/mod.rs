//! Injectable payload cache keyed by query.
//!
//! A loader consults its cache (if one was given) before fetching and stores every
//! successful payload back under the query that produced it. Nothing is global: share a
//! cache between loaders by handing them the same `Arc`.

mod error;
mod in_memory;

pub use error::CacheError;
pub use in_memory::InMemoryCache;

use async_trait::async_trait;
use std::time::Duration;

/// Key-value storage with optional TTL.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    /// Returns `None` if the key is missing or has expired.
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value`. With `ttl: None` the entry never expires.
    async fn set(&self, key: K, value: V, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &K) -> Result<(), CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

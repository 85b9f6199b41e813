//! # Resource Loader
//!
//! Fetches a named remote collection on behalf of a view, exposes `{data, loading, error}`
//! to a consumer, and re-fetches when its query changes. Rendering-agnostic: consumers
//! subscribe to explicit state transitions or poll the current state.
//!
//! ## Design
//!
//! - **Generation-tagged requests**: every issued request carries a generation number;
//!   only the latest generation may settle the state, so the last issued query wins
//!   even when older responses arrive later ([`LoaderCore`]).
//! - **Errors are data**: a failed fetch becomes [`LoadState::Failed`]; nothing is
//!   thrown at the consumer and nothing is retried automatically.
//! - **No global state**: each [`Loader`] owns its state; caching ([`Cache`],
//!   [`InMemoryCache`]) and cross-loader request sharing ([`CoalescingFetcher`]) are
//!   injected explicitly.
//!
//! ## Main modules
//!
//! - [`machine`]: [`LoaderCore`], [`Ticket`]: the synchronous state machine.
//! - [`loader`]: [`Loader`], [`LoaderBuilder`]: async driver on tokio.
//! - [`state`]: [`LoadState`], [`LoadView`], [`Snapshot`].
//! - [`fetcher`]: [`Fetcher`] trait, [`fetcher_fn`].
//! - [`http`]: [`HttpFetcher`], [`HttpClient`], [`ReqwestHttpClient`].
//! - [`cache`]: [`Cache`], [`InMemoryCache`], [`CacheError`].
//! - [`coalesce`]: [`CoalescingFetcher`].
//! - [`selector`]: [`Selector`] for memoized derived values.
//! - [`protocol`]: snapshot to `load-event` JSON.
//! - [`config`]: [`LoaderConfig`] from environment.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use resource_loader::{fetcher_fn, FetchError, Loader, Query};
//!
//! # async fn demo() {
//! let loader = Loader::new(fetcher_fn(|q: Query| async move {
//!     Ok::<_, FetchError>(vec![format!("first item of {}", q.endpoint())])
//! }));
//! loader.on_transition(|view| println!("loading={} data={:?}", view.loading, view.data));
//! loader.initialize(Query::new("dashboard"));
//! let settled = loader.settled().await;
//! # }
//! ```

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod loader;
pub mod machine;
pub mod protocol;
pub mod query;
pub mod selector;
pub mod state;

pub use cache::{Cache, CacheError, InMemoryCache};
pub use coalesce::CoalescingFetcher;
pub use config::{LoaderConfig, DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT};
pub use error::FetchError;
pub use fetcher::{fetcher_fn, Fetcher, FnFetcher};
pub use http::{HttpClient, HttpFetcher, ReqwestHttpClient};
pub use loader::{Loader, LoaderBuilder};
pub use machine::{LoaderCore, Ticket};
pub use protocol::{snapshot_to_event, snapshot_to_json};
pub use query::Query;
pub use selector::Selector;
pub use state::{LoadState, LoadView, Snapshot};

/// When running `cargo test -p resource-loader`, initializes tracing from `RUST_LOG` so
/// unit tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}

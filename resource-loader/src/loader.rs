//! Async loader: drives a [`LoaderCore`] with a [`Fetcher`] and an optional [`Cache`],
//! and publishes every state transition.
//!
//! Issuing is synchronous: `initialize` / `set_query` / `refetch` update the state to
//! Loading, publish it, spawn the fetch on the current tokio runtime and return. The
//! spawned task reports back under its ticket's generation; outcomes of superseded
//! tickets are discarded by the core.
//!
//! # Observing transitions
//!
//! - [`Loader::on_transition`] / [`Loader::on_snapshot`]: callbacks invoked synchronously,
//!   in order, for every transition. Callbacks may read the loader (`view`, `snapshot`)
//!   but must not issue requests or tear it down.
//! - [`Loader::subscribe`] / [`Loader::stream`]: a `watch` channel of [`Snapshot`]s. Fast
//!   successive transitions may be coalesced; poll with `borrow()` or await `changed()`.
//! - [`Loader::snapshot`] / [`Loader::view`]: poll the current state.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::cache::{Cache, InMemoryCache};
use crate::config::LoaderConfig;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::machine::{LoaderCore, Ticket};
use crate::state::{LoadView, Snapshot};

type Callback<Q, T> = Box<dyn FnMut(&Snapshot<Q, T>) + Send>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the loader handle and its spawned fetch tasks.
struct Shared<Q, T> {
    name: String,
    /// Serializes transitions with their publication; always taken before `core`.
    publishing: Mutex<()>,
    core: Mutex<LoaderCore<Q, T>>,
    callbacks: Mutex<Vec<Callback<Q, T>>>,
    tx: watch::Sender<Snapshot<Q, T>>,
    in_flight: Mutex<Option<(u64, JoinHandle<()>)>>,
    torn_down: CancellationToken,
}

impl<Q, T> Shared<Q, T>
where
    Q: Clone + PartialEq + Debug,
    T: Clone,
{
    fn issue(
        &self,
        step: impl FnOnce(&mut LoaderCore<Q, T>) -> Option<Ticket<Q>>,
    ) -> Option<Ticket<Q>> {
        let _order = lock(&self.publishing);
        let (ticket, snapshot) = {
            let mut core = lock(&self.core);
            let ticket = step(&mut core)?;
            (ticket, core.snapshot())
        };
        tracing::debug!(
            loader = %self.name,
            generation = ticket.generation,
            query = ?ticket.query,
            bypass_cache = ticket.bypass_cache,
            "issuing request"
        );
        self.publish(snapshot);
        Some(ticket)
    }

    fn settle(&self, generation: u64, outcome: Result<T, FetchError>) {
        let _order = lock(&self.publishing);
        let mut core = lock(&self.core);
        let accepted = match outcome {
            Ok(payload) => core.on_resolve(generation, payload),
            Err(error) => {
                tracing::debug!(loader = %self.name, generation, %error, "fetch failed");
                core.on_reject(generation, error)
            }
        };
        if accepted {
            tracing::debug!(
                loader = %self.name,
                generation,
                state = core.state().kind(),
                "request settled"
            );
            let snapshot = core.snapshot();
            drop(core);
            self.publish(snapshot);
        } else {
            tracing::debug!(
                loader = %self.name,
                generation,
                current = core.generation(),
                active = core.is_active(),
                "discarding stale outcome"
            );
        }
    }

    /// Called with `publishing` held and `core` released, so callbacks see transitions in
    /// order and may read the loader's state.
    fn publish(&self, snapshot: Snapshot<Q, T>) {
        for callback in lock(&self.callbacks).iter_mut() {
            callback(&snapshot);
        }
        self.tx.send_replace(snapshot);
    }
}

/// Loads one resource on behalf of a view. See the [module docs](self).
///
/// Dropping the loader tears it down.
pub struct Loader<Q, T> {
    shared: Arc<Shared<Q, T>>,
    fetcher: Arc<dyn Fetcher<Q, T>>,
    cache: Option<Arc<dyn Cache<Q, T>>>,
    cache_ttl: Option<Duration>,
    abort_superseded: bool,
}

impl<Q, T> Loader<Q, T>
where
    Q: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// A loader with no cache that only ignores superseded requests.
    pub fn new<F>(fetcher: F) -> Self
    where
        F: Fetcher<Q, T> + 'static,
    {
        Self::builder(fetcher).build()
    }

    pub fn builder<F>(fetcher: F) -> LoaderBuilder<Q, T>
    where
        F: Fetcher<Q, T> + 'static,
    {
        LoaderBuilder::new(Arc::new(fetcher))
    }

    /// Starts loading `query`. Returns false when nothing was issued: the loader is torn
    /// down, or `query` is already loading or loaded. Calling this again with a query
    /// that failed retries it.
    pub fn initialize(&self, query: Q) -> bool {
        self.run(|core| core.initialize(query))
    }

    /// Re-loads when `query` differs from the last issued one; the older request's
    /// outcome will be ignored.
    pub fn set_query(&self, query: Q) -> bool {
        self.run(|core| core.on_query_change(query))
    }

    /// Re-issues the last query, bypassing the idempotence check but not the cache.
    pub fn refetch(&self) -> bool {
        self.run(LoaderCore::refetch)
    }

    fn run(&self, step: impl FnOnce(&mut LoaderCore<Q, T>) -> Option<Ticket<Q>>) -> bool {
        match self.shared.issue(step) {
            Some(ticket) => {
                self.dispatch(ticket);
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, ticket: Ticket<Q>) {
        let generation = ticket.generation;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.settle(
                    generation,
                    Err(FetchError::new(format!("no async runtime: {}", e))),
                );
                return;
            }
        };
        let shared = Arc::clone(&self.shared);
        let fetcher = Arc::clone(&self.fetcher);
        let cache = self.cache.clone();
        let ttl = self.cache_ttl;
        let handle = runtime.spawn(async move {
            let cache = cache.as_deref().map(|cache| (cache, ticket.bypass_cache));
            let outcome = load(fetcher.as_ref(), cache, ttl, &ticket.query).await;
            shared.settle(ticket.generation, outcome);
        });
        self.track(generation, handle);
    }

    /// Keeps the newest task's handle; older ones are aborted when configured to.
    fn track(&self, generation: u64, handle: JoinHandle<()>) {
        let mut slot = lock(&self.shared.in_flight);
        if self.shared.torn_down.is_cancelled() {
            if self.abort_superseded {
                handle.abort();
            }
            return;
        }
        if matches!(slot.as_ref(), Some((tracked, _)) if *tracked > generation) {
            if self.abort_superseded {
                handle.abort();
            }
            return;
        }
        if let Some((_, previous)) = slot.replace((generation, handle)) {
            if self.abort_superseded {
                previous.abort();
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot<Q, T> {
        lock(&self.shared.core).snapshot()
    }

    pub fn view(&self) -> LoadView<T> {
        lock(&self.shared.core).state().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<Q, T>> {
        self.shared.tx.subscribe()
    }

    /// Yields the current snapshot, then one per observed change.
    pub fn stream(&self) -> WatchStream<Snapshot<Q, T>> {
        WatchStream::new(self.subscribe())
    }

    /// Registers a consumer of `{data, loading, error}`, invoked on every later transition.
    pub fn on_transition<F>(&self, mut f: F)
    where
        F: FnMut(&LoadView<T>) + Send + 'static,
    {
        self.on_snapshot(move |snapshot| f(&snapshot.view()));
    }

    /// Like [`Loader::on_transition`] but with the generation and query.
    pub fn on_snapshot<F>(&self, f: F)
    where
        F: FnMut(&Snapshot<Q, T>) + Send + 'static,
    {
        lock(&self.shared.callbacks).push(Box::new(f));
    }

    /// Waits until the current request is Loaded or Failed.
    ///
    /// Returns `None` if the loader is torn down first. Never returns for a loader that
    /// was never initialized.
    pub async fn settled(&self) -> Option<Snapshot<Q, T>> {
        let mut rx = self.subscribe();
        tokio::select! {
            biased;
            settled = rx.wait_for(|s| s.state.is_settled()) => settled.ok().map(|s| (*s).clone()),
            _ = self.shared.torn_down.cancelled() => None,
        }
    }
}

impl<Q, T> Loader<Q, T> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.core).is_active()
    }

    /// Deactivates the loader: pending outcomes are dropped and no further transitions
    /// are published. With `abort_superseded`, the in-flight task is aborted too.
    pub fn teardown(&self) {
        {
            let _order = lock(&self.shared.publishing);
            if !lock(&self.shared.core).teardown() {
                return;
            }
        }
        self.shared.torn_down.cancel();
        if self.abort_superseded {
            if let Some((_, handle)) = lock(&self.shared.in_flight).take() {
                handle.abort();
            }
        }
        tracing::debug!(loader = %self.shared.name, "loader torn down");
    }
}

impl<Q, T> Drop for Loader<Q, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// `cache` comes with its bypass flag: when set, the lookup is skipped but a fresh payload
/// still replaces the cached one.
async fn load<Q, T>(
    fetcher: &dyn Fetcher<Q, T>,
    cache: Option<(&dyn Cache<Q, T>, bool)>,
    ttl: Option<Duration>,
    query: &Q,
) -> Result<T, FetchError>
where
    Q: Clone + Debug + Send + Sync,
    T: Clone + Send + Sync,
{
    if let Some((cache, false)) = cache {
        if let Some(hit) = cache.get(query).await {
            tracing::debug!(query = ?query, "cache hit");
            return Ok(hit);
        }
    }
    let outcome = fetcher.fetch(query).await;
    if let (Some((cache, _)), Ok(payload)) = (cache, &outcome) {
        if let Err(e) = cache.set(query.clone(), payload.clone(), ttl).await {
            tracing::warn!(query = ?query, error = %e, "cache write failed");
        }
    }
    outcome
}

/// Builder for [`Loader`].
pub struct LoaderBuilder<Q, T> {
    fetcher: Arc<dyn Fetcher<Q, T>>,
    cache: Option<Arc<dyn Cache<Q, T>>>,
    cache_ttl: Option<Duration>,
    abort_superseded: bool,
    name: String,
}

impl<Q, T> LoaderBuilder<Q, T>
where
    Q: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(fetcher: Arc<dyn Fetcher<Q, T>>) -> Self {
        Self {
            fetcher,
            cache: None,
            cache_ttl: None,
            abort_superseded: false,
            name: "loader".to_string(),
        }
    }

    /// Consult `cache` before fetching and store successful payloads in it. Share the
    /// same `Arc` between loaders to share entries.
    pub fn cache(mut self, cache: Arc<dyn Cache<Q, T>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// TTL for entries this loader writes. Without it entries never expire.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn abort_superseded(mut self, abort: bool) -> Self {
        self.abort_superseded = abort;
        self
    }

    /// Name used in log fields.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Applies `cache_ttl` and `abort_superseded` from config. A TTL without an injected
    /// cache gives this loader its own [`InMemoryCache`].
    pub fn config(mut self, config: &LoaderConfig) -> Self {
        self.abort_superseded = config.abort_superseded;
        self.cache_ttl = config.cache_ttl;
        if config.cache_ttl.is_some() && self.cache.is_none() {
            self.cache = Some(Arc::new(InMemoryCache::new()));
        }
        self
    }

    pub fn build(self) -> Loader<Q, T> {
        let (tx, _) = watch::channel(Snapshot::default());
        Loader {
            shared: Arc::new(Shared {
                name: self.name,
                publishing: Mutex::new(()),
                core: Mutex::new(LoaderCore::new()),
                callbacks: Mutex::new(Vec::new()),
                tx,
                in_flight: Mutex::new(None),
                torn_down: CancellationToken::new(),
            }),
            fetcher: self.fetcher,
            cache: self.cache,
            cache_ttl: self.cache_ttl,
            abort_superseded: self.abort_superseded,
        }
    }
}

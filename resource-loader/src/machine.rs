//! Synchronous loader state machine.
//!
//! [`LoaderCore`] owns the generation counter and the current [`LoadState`]. It never
//! performs I/O: issuing a request hands back a [`Ticket`], and the outcome is fed back
//! through [`LoaderCore::on_resolve`] / [`LoaderCore::on_reject`] tagged with the ticket's
//! generation. Outcomes for any generation other than the latest are discarded, so the
//! last issued query wins regardless of the order responses arrive in.

use crate::error::FetchError;
use crate::state::{LoadState, Snapshot};

/// A request to issue: the query and the generation its outcome must be reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<Q> {
    pub generation: u64,
    pub query: Q,
    /// Skip cached payloads and fetch. The fresh payload is still written to the cache.
    pub bypass_cache: bool,
}

#[derive(Debug)]
pub struct LoaderCore<Q, T> {
    generation: u64,
    query: Option<Q>,
    state: LoadState<T>,
    active: bool,
}

impl<Q, T> Default for LoaderCore<Q, T> {
    fn default() -> Self {
        Self {
            generation: 0,
            query: None,
            state: LoadState::Idle,
            active: true,
        }
    }
}

impl<Q, T> LoaderCore<Q, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last issued query.
    pub fn query(&self) -> Option<&Q> {
        self.query.as_ref()
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates the core. Returns false if it was already torn down.
    pub fn teardown(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }
}

impl<Q, T> LoaderCore<Q, T>
where
    Q: Clone + PartialEq,
{
    /// Moves to Loading for `query` and returns the ticket to fetch.
    ///
    /// Returns `None` when `query` equals the last issued query and that request is still
    /// loading or has loaded. A failed query is re-issued: that is the retry path.
    pub fn initialize(&mut self, query: Q) -> Option<Ticket<Q>> {
        if !self.active {
            return None;
        }
        if self.query.as_ref() == Some(&query)
            && (self.state.is_loading() || self.state.is_loaded())
        {
            return None;
        }
        Some(self.issue(query, false))
    }

    /// Re-initializes only when `query` differs from the last issued one. The in-flight
    /// request, if any, becomes stale.
    pub fn on_query_change(&mut self, query: Q) -> Option<Ticket<Q>> {
        if !self.active || self.query.as_ref() == Some(&query) {
            return None;
        }
        Some(self.issue(query, false))
    }

    /// Re-issues the last query whatever the current state, past any cache.
    pub fn refetch(&mut self) -> Option<Ticket<Q>> {
        if !self.active {
            return None;
        }
        let query = self.query.clone()?;
        Some(self.issue(query, true))
    }

    fn issue(&mut self, query: Q, bypass_cache: bool) -> Ticket<Q> {
        self.generation += 1;
        self.query = Some(query.clone());
        self.state = LoadState::Loading;
        Ticket {
            generation: self.generation,
            query,
            bypass_cache,
        }
    }

    /// Returns true when the payload was accepted (state is now Loaded).
    pub fn on_resolve(&mut self, generation: u64, payload: T) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.state = LoadState::Loaded(payload);
        true
    }

    /// Returns true when the error was accepted (state is now Failed).
    pub fn on_reject(&mut self, generation: u64, error: FetchError) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.state = LoadState::Failed(error);
        true
    }

    fn accepts(&self, generation: u64) -> bool {
        self.active && generation == self.generation && self.state.is_loading()
    }
}

impl<Q: Clone, T: Clone> LoaderCore<Q, T> {
    pub fn snapshot(&self) -> Snapshot<Q, T> {
        Snapshot {
            generation: self.generation,
            query: self.query.clone(),
            state: self.state.clone(),
        }
    }
}

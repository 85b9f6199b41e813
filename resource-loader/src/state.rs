//! Load state, its consumer-facing view, and the published snapshot.

use serde::Serialize;

use crate::error::FetchError;

/// Where a loader is in its request lifecycle. Exactly one variant holds at a time.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum LoadState<T> {
    /// Constructed, nothing issued yet. Never re-entered.
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(FetchError),
}

impl<T> LoadState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, LoadState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed(_))
    }

    /// Loaded or Failed: the current request is over.
    pub fn is_settled(&self) -> bool {
        self.is_loaded() || self.is_failed()
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Short lowercase name, used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Loaded(_) => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }
}

impl<T: Clone> LoadState<T> {
    pub fn view(&self) -> LoadView<T> {
        self.clone().into()
    }
}

/// What a consumer renders from: `{data, loading, error}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadView<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for LoadView<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> From<LoadState<T>> for LoadView<T> {
    fn from(state: LoadState<T>) -> Self {
        match state {
            LoadState::Idle => LoadView::default(),
            LoadState::Loading => LoadView {
                loading: true,
                ..LoadView::default()
            },
            LoadState::Loaded(data) => LoadView {
                data: Some(data),
                ..LoadView::default()
            },
            LoadState::Failed(error) => LoadView {
                error: Some(error),
                ..LoadView::default()
            },
        }
    }
}

impl<T> LoadView<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LoadView<U> {
        LoadView {
            data: self.data.map(f),
            loading: self.loading,
            error: self.error,
        }
    }
}

impl<E> LoadView<Vec<E>> {
    /// Keeps at most `n` loaded items (e.g. "pinned dashboards, first four").
    pub fn limit(mut self, n: usize) -> Self {
        if let Some(items) = self.data.as_mut() {
            items.truncate(n);
        }
        self
    }
}

/// Published on every transition: the state plus the query and generation it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<Q, T> {
    pub generation: u64,
    pub query: Option<Q>,
    pub state: LoadState<T>,
}

impl<Q, T> Default for Snapshot<Q, T> {
    fn default() -> Self {
        Self {
            generation: 0,
            query: None,
            state: LoadState::Idle,
        }
    }
}

impl<Q, T: Clone> Snapshot<Q, T> {
    pub fn view(&self) -> LoadView<T> {
        self.state.view()
    }
}

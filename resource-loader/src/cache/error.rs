//! Cache-related errors.

use thiserror::Error;

/// Errors a cache backend may report. The loader logs them and carries on: a cache is an
/// optimisation, never a reason to fail a load.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend refused the entry (e.g. it is full or read-only).
    #[error("cache rejected entry: {0}")]
    Rejected(String),
}

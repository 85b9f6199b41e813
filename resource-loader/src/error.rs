//! Fetch error carried inside [`LoadState::Failed`](crate::LoadState::Failed).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed fetch.
///
/// The loader makes no distinction between network, decode and server failures: the
/// message is carried through as-is and the consumer decides what it means. `Display`
/// is the bare message so `"network error"` renders as `network error`.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(transparent)]
#[error("{message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("decode: {}", e))
    }
}

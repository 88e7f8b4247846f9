//! Error types for the engine.
//!
//! Backend failures keep the server's own message so mutation errors can be
//! shown to the user verbatim. Storage failures wrap the SQLite layer.

use std::fmt;

use thiserror::Error;

use crate::fetch::PageStrategy;

/// A failed call to the git or analytics backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with an error status. `message` is the text from
    /// its `{"error": ...}` body, or the raw body when it was not JSON.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response (refused, timed out, reset).
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// A pre-rendered commit page was short without marking the end of history.
    #[error("rendered commit page from {endpoint} was incomplete ({recovered} entries recovered)")]
    Markup { endpoint: String, recovered: usize },

    #[error("invalid backend address: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// True when the backend itself rejected the request, as opposed to the
    /// request failing in transit.
    pub fn is_server_rejection(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

/// Every strategy of a fetch plan failed.
#[derive(Debug)]
pub struct FetchError {
    pub attempts: Vec<(PageStrategy, BackendError)>,
}

impl FetchError {
    /// The error of the last strategy tried, which is the one worth showing.
    pub fn last(&self) -> Option<&BackendError> {
        self.attempts.last().map(|(_, err)| err)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attempts.last() {
            Some((strategy, err)) => write!(
                f,
                "all {} fetch strategies failed (last: {strategy}: {err})",
                self.attempts.len()
            ),
            None => f.write_str("no fetch strategy was attempted"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last().map(|err| err as _)
    }
}

/// A failure of the durable UI-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ui state database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("could not create state directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A date range typed by the user that could not be read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("expected a date as YYYY-MM-DD, got {0:?}")]
    BadDate(String),

    #[error("range ends before it starts")]
    Reversed,
}

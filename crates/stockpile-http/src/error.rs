//! Error types for pooled HTTP calls
use thiserror::Error;

/// Result type for pooled HTTP calls
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from a pooled HTTP call.
///
/// Pool failures (closed, timed out) and transport failures stay distinct so
/// callers can tell "no client available" from "the request failed".
#[derive(Error, Debug)]
pub enum Error {
    /// No client could be checked out of the pool
    #[error("Client pool error: {0}")]
    Pool(#[from] stockpile::Error),

    /// The request itself failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the pool had been shut down
    #[must_use]
    pub fn is_pool_closed(&self) -> bool {
        matches!(self, Self::Pool(e) if e.is_closed())
    }
}

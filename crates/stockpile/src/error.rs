//! Error types for pool operations
use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a [`Factory`](crate::Factory).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`Pool`](crate::Pool) operations.
///
/// Runtime errors are handed to the immediate caller; the pool itself never
/// logs, retries or suppresses them.
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// The factory failed while filling the pool at construction time.
    ///
    /// No pool is produced and every resource created before the failure
    /// has already been disposed.
    #[error("Factory failed to fill the pool ({created} of {requested} created): {source}")]
    ConstructionFailed {
        /// Resources successfully created (and then disposed) before the failure
        created: usize,
        /// Resources the fill asked for
        requested: usize,
        /// The factory error
        #[source]
        source: BoxError,
    },

    /// The factory failed to create a resource on demand
    #[error("Factory failed to create a resource: {source}")]
    Create {
        /// The factory error
        #[source]
        source: BoxError,
    },

    /// The pool has been shut down
    #[error("Pool is closed")]
    Closed,

    /// An absent resource was handed to `release`
    #[error("Cannot release an absent resource")]
    InvalidResource,

    /// A blocking acquire gave up after its deadline
    #[error("Acquire timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// A blocking acquire was abandoned through its cancellation token
    #[error("Acquire was cancelled")]
    Cancelled,

    /// Nothing is available right now and the caller asked not to wait
    #[error("Pool exhausted: {in_use}/{max_size} in use")]
    Exhausted {
        /// Resources currently checked out
        in_use: usize,
        /// Pool capacity
        max_size: usize,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// A closed pool never reopens, so `Closed` is permanent; timeouts and
    /// exhaustion may clear once other callers release.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Exhausted { .. } | Self::Create { .. }
        )
    }

    /// Whether this error means the pool has been shut down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

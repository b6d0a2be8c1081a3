//! Error types shared by the combinator and the stream adapter.
//!
//! Every failure travels through the produced stream as an `Err` item, so
//! consumers see configuration, transform, source and stream failures on the
//! same channel as values.

use thiserror::Error;

/// Boxed error carried for failures that originate in caller code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for parallel map operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for all parallel map operations
#[derive(Error, Debug)]
pub enum Error {
    /// The concurrency limit was zero, negative, fractional or NaN
    #[error("concurrency must be a positive integer or unbounded, got {value}")]
    InvalidConcurrency {
        /// Printed form of the rejected value
        value: String,
    },

    /// A stream adapter configuration failed validation
    #[error("invalid stream adapter config: {0}")]
    InvalidConfig(String),

    /// The transform failed for the item at `index`
    #[error("transform failed for item {index}: {source}")]
    Transform {
        /// Source position of the failed item
        index: usize,
        /// Error returned by the transform
        #[source]
        source: BoxError,
    },

    /// Pulling from the source failed after `index` items had been taken
    #[error("source failed after {index} items: {source}")]
    Source {
        /// Number of items pulled before the failure
        index: usize,
        /// Error returned by the source
        #[source]
        source: BoxError,
    },

    /// A push-based stream reported an error
    #[error("stream failed: {0}")]
    Stream(#[source] BoxError),

    /// A spawned transform task ended without sending its value
    #[error("transform task for item {index} ended without producing a value")]
    TaskLost {
        /// Source position of the lost item
        index: usize,
    },
}

impl Error {
    /// Create an [`Error::InvalidConcurrency`] from any printable value.
    pub fn invalid_concurrency(value: impl std::fmt::Display) -> Self {
        Error::InvalidConcurrency {
            value: value.to_string(),
        }
    }

    /// Source position the error is attached to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Error::Transform { index, .. }
            | Error::Source { index, .. }
            | Error::TaskLost { index } => Some(*index),
            _ => None,
        }
    }
}

//! Engine error types.

use feedmark_store::StoreError;
use thiserror::Error;

/// Engine-level errors.
///
/// Benign concurrency signals never appear here; they are absorbed into
/// boolean outcomes before an error crosses the public API. Cache failures
/// never appear here either; they are logged and swallowed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Personal feed creation gave up after the configured attempt cap
    #[error("Creation retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The store error from the final attempt
        #[source]
        source: StoreError,
    },

    /// Personal feed creation ran out of time before the attempt cap
    #[error("Creation deadline exceeded after {attempts} attempts")]
    DeadlineExceeded {
        /// Number of attempts made before the deadline cut in
        attempts: u32,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

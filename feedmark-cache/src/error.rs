//! Cache layer errors

use thiserror::Error;

/// Errors that can occur in the cache layer.
///
/// All of these are non-fatal to callers of the sync engine: a failed cache
/// operation degrades to the durable store and is logged, never surfaced.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache backend is unreachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Cache backend rejected or failed the operation
    #[error("Cache operation failed: {0}")]
    Operation(String),
}

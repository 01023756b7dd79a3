//! Conflict classification.
//!
//! One total, pure function maps every store failure signal to a high-level
//! verdict, so the decision "was this error actually another writer winning
//! the race?" lives in a single testable place instead of scattered error
//! filters at call sites. Unrecognized errors are never guessed at; they are
//! always `Fatal`.

use feedmark_store::StoreError;

/// What a store error means for the operation that hit it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictVerdict {
    /// Another concurrent writer already achieved an equivalent outcome;
    /// treat the operation as having succeeded
    AlreadyApplied,
    /// Commit-time conflict under serializable isolation; the whole attempt
    /// can be retried from scratch
    Transient,
    /// Genuinely unexpected; propagate unchanged
    Fatal,
}

/// Classify a store error.
///
/// - Unique constraint violations and optimistic-concurrency violations mean
///   a concurrent writer inserted or advanced the same row first:
///   `AlreadyApplied`.
/// - Serialization failures mean the serializable transaction lost a race it
///   may win on retry: `Transient`.
/// - Everything else, including unrecognized database errors, is `Fatal`.
pub fn classify(error: &StoreError) -> ConflictVerdict {
    match error {
        StoreError::Duplicate { .. } => ConflictVerdict::AlreadyApplied,
        StoreError::ConcurrentModification { .. } => ConflictVerdict::AlreadyApplied,
        StoreError::SerializationFailure(_) => ConflictVerdict::Transient,
        StoreError::NotFound { .. }
        | StoreError::Database(_)
        | StoreError::Connection(_)
        | StoreError::TransactionClosed(_)
        | StoreError::Domain(_) => ConflictVerdict::Fatal,
    }
}

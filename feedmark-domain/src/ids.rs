//! Identifiers for the Feedmark Domain
//!
//! Validated domain primitives. `BlockIndex` is the logical clock that
//! orders read positions; `UserId` and `FeedId` key them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Domain errors for identifier validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// FeedId must be non-empty
    #[error("Invalid feed id: {0}")]
    InvalidFeedId(String),

    /// BlockIndex arithmetic overflowed
    #[error("Block index overflow at {0}")]
    BlockIndexOverflow(u64),
}

// =============================================================================
// BlockIndex
// =============================================================================

/// BlockIndex is an opaque, totally ordered logical clock.
///
/// Used as the payload of a read position. Comparison is the only operation
/// concurrency control needs; wall-clock time never participates in ordering.
///
/// # Invariants
/// - Totally ordered (derived `Ord`)
/// - Non-negative (unsigned representation)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct BlockIndex(u64);

impl BlockIndex {
    /// The default position for users/feeds with no recorded state.
    pub const ZERO: BlockIndex = BlockIndex(0);

    /// Create a BlockIndex from a raw clock value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the underlying clock value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The next index in the clock.
    ///
    /// # Errors
    /// Returns `DomainError::BlockIndexOverflow` at `u64::MAX`.
    pub fn next(&self) -> Result<Self, DomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(DomainError::BlockIndexOverflow(self.0))
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// UserId
// =============================================================================

/// UserId identifies the owner of read positions and personal feeds.
///
/// The id is carried verbatim from the surrounding service, which may hand
/// us a blank id for unauthenticated callers. Blank ids are representable on
/// purpose: the sync engine answers them with defaults instead of touching
/// storage, so validation lives at the call site, not the constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a UserId from a raw string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// True when the id is blank (no authenticated user)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the underlying string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// FeedId
// =============================================================================

/// FeedId identifies a feed a user can read.
///
/// # Invariants
/// - Must be non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedId(String);

impl FeedId {
    /// Create a FeedId with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFeedId` if the id is blank
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidFeedId("Feed id must be non-empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Mint a fresh, time-ordered FeedId for a new personal feed
    pub fn new_unique() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the underlying string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_index_ordering() {
        assert!(BlockIndex::new(2) > BlockIndex::new(1));
        assert!(BlockIndex::new(1) > BlockIndex::ZERO);
        assert_eq!(BlockIndex::new(0), BlockIndex::ZERO);
    }

    #[test]
    fn test_block_index_next() {
        assert_eq!(BlockIndex::new(7).next().unwrap(), BlockIndex::new(8));
        assert!(BlockIndex::new(u64::MAX).next().is_err());
    }

    #[test]
    fn test_user_id_empty() {
        assert!(UserId::new("").is_empty());
        assert!(!UserId::new("alice").is_empty());
    }

    #[test]
    fn test_feed_id_rejects_blank() {
        assert!(FeedId::new("").is_err());
        assert!(FeedId::new("feed-1").is_ok());
    }

    #[test]
    fn test_feed_id_unique() {
        assert_ne!(FeedId::new_unique(), FeedId::new_unique());
    }
}

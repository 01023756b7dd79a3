//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the domain.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use feedmark_domain::{BlockIndex, FeedId, PersonalFeed, UserId};
use std::collections::HashMap;

/// Repository for read positions
///
/// `upsert_max_wins` is the only write. It must apply the max-wins
/// comparison and the insert-or-update atomically (a single conditional
/// statement or equivalent), which is what makes concurrent markers for the
/// same `(user, feed)` pair race-free by construction.
#[async_trait]
pub trait ReadPositionRepository: Send + Sync {
    /// Get the recorded position for one user/feed pair
    ///
    /// Returns `None` when no position has ever been recorded.
    async fn get(&self, user_id: &UserId, feed_id: &FeedId)
        -> Result<Option<BlockIndex>, StoreError>;

    /// Get all recorded positions for a user, keyed by feed
    ///
    /// Feeds the user has never read are absent from the map.
    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, StoreError>;

    /// Atomically apply a candidate position under max-wins semantics.
    ///
    /// Inserts the first-ever position or advances an existing one, but only
    /// when the candidate is strictly greater than the stored value.
    ///
    /// Returns `true` when the stored value changed, `false` when the
    /// candidate was equal or smaller (a no-op, not an error).
    async fn upsert_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, StoreError>;
}

/// Repository for personal feeds
#[async_trait]
pub trait PersonalFeedRepository: Send + Sync {
    /// Open a serializable transaction for check-then-create.
    ///
    /// The returned transaction detects conflicts optimistically: a
    /// concurrent creation for the same owner may only surface at `commit`,
    /// as `StoreError::SerializationFailure` or `StoreError::Duplicate`.
    async fn begin_serializable(&self) -> Result<Box<dyn PersonalFeedTx>, StoreError>;

    /// Get a user's personal feed, if one exists
    async fn find_by_owner(&self, owner_id: &UserId) -> Result<Option<PersonalFeed>, StoreError>;
}

/// A serializable transaction over personal feeds.
///
/// Consumed by `commit` or `rollback`; dropping without either rolls back
/// implicitly in real stores.
#[async_trait]
pub trait PersonalFeedTx: Send {
    /// Check whether the owner already has a personal feed
    async fn owner_exists(&mut self, owner_id: &UserId) -> Result<bool, StoreError>;

    /// Insert a personal feed into this transaction
    async fn insert(&mut self, feed: &PersonalFeed) -> Result<(), StoreError>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Roll the transaction back, discarding the insert
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

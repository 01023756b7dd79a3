//! Cache trait definition (Port)

use crate::error::CacheError;
use async_trait::async_trait;
use feedmark_domain::{BlockIndex, FeedId, UserId};
use std::collections::HashMap;

/// Fast key-value cache for read positions.
///
/// Implementations may lose entries at any time; callers must always be able
/// to fall back to the durable store. `set_one_max_wins` must apply the
/// shared max-wins comparison so cache writers can never regress an entry.
#[async_trait]
pub trait ReadPositionCache: Send + Sync {
    /// Get the cached position for one user/feed pair
    async fn get_one(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, CacheError>;

    /// Get all cached positions for a user.
    ///
    /// An empty map is a valid miss, not an error.
    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, CacheError>;

    /// Write one position under max-wins semantics.
    ///
    /// Returns `true` when the cached value advanced.
    async fn set_one_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, CacheError>;

    /// Bulk-populate a user's positions after a store-side bulk read.
    ///
    /// Each entry is applied under the same max-wins rule as `set_one_max_wins`.
    async fn set_all_for_user(
        &self,
        user_id: &UserId,
        positions: &HashMap<FeedId, BlockIndex>,
    ) -> Result<(), CacheError>;
}

//! Read position synchronization.
//!
//! Cache-aside reads, write-through writes. The durable store is always the
//! source of truth; every cache interaction is best-effort with a bounded
//! timeout, and a cache failure can change latency but never a result.

use crate::config::SyncConfig;
use crate::conflict::{classify, ConflictVerdict};
use crate::error::EngineResult;
use feedmark_cache::ReadPositionCache;
use feedmark_domain::{BlockIndex, FeedId, UserId};
use feedmark_store::ReadPositionRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Synchronizes per-user, per-feed read positions across devices.
///
/// Concurrent `mark_feed_as_read` calls for the same `(user, feed)` pair are
/// race-free because the deciding comparison happens inside the store's
/// atomic conditional upsert, not in this process.
pub struct ReadPositionSyncEngine {
    store: Arc<dyn ReadPositionRepository>,
    cache: Arc<dyn ReadPositionCache>,
    config: SyncConfig,
}

impl ReadPositionSyncEngine {
    /// Create an engine over a store and a cache
    pub fn new(
        store: Arc<dyn ReadPositionRepository>,
        cache: Arc<dyn ReadPositionCache>,
        config: SyncConfig,
    ) -> Self {
        Self { store, cache, config }
    }

    /// Get a user's read position in one feed.
    ///
    /// A blank user id and a user/feed pair with no recorded position both
    /// yield `BlockIndex::ZERO`; absence is a default, never an error.
    pub async fn get_read_position(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> EngineResult<BlockIndex> {
        if user_id.is_empty() {
            return Ok(BlockIndex::ZERO);
        }

        // Fast path: cache hit
        if let Some(cached) = self.cache_get_one(user_id, feed_id).await {
            return Ok(cached);
        }

        match self.store.get(user_id, feed_id).await? {
            Some(found) => {
                // Repopulate the cache for the next reader. Best-effort: the
                // returned value is already decided.
                self.cache_set_one(user_id, feed_id, found).await;
                Ok(found)
            }
            // Nothing stored, nothing to cache
            None => Ok(BlockIndex::ZERO),
        }
    }

    /// Get all of a user's read positions, keyed by feed.
    ///
    /// Feeds with no recorded position are absent from the map; callers
    /// treat absence as `BlockIndex::ZERO`.
    pub async fn get_read_positions_for_user(
        &self,
        user_id: &UserId,
    ) -> EngineResult<HashMap<FeedId, BlockIndex>> {
        if user_id.is_empty() {
            return Ok(HashMap::new());
        }

        // Fast path: a non-empty bulk cache hit
        let cached = self.cache_get_all(user_id).await;
        if !cached.is_empty() {
            return Ok(cached);
        }

        let stored = self.store.get_all_for_user(user_id).await?;
        if !stored.is_empty() {
            self.cache_set_all(user_id, &stored).await;
        }

        Ok(stored)
    }

    /// Record that a user has read a feed up to `candidate`.
    ///
    /// Write-through: the store decides first, atomically, under max-wins
    /// semantics; its answer is authoritative. The cache is only written
    /// after a store-side update, with the identical semantics, and a cache
    /// failure never changes the return value.
    ///
    /// Returns `true` when the position advanced (or a concurrent writer
    /// already advanced it at least this far), `false` for an equal-or-smaller
    /// candidate or a blank user id.
    pub async fn mark_feed_as_read(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> EngineResult<bool> {
        if user_id.is_empty() {
            return Ok(false);
        }

        let updated = match self.store.upsert_max_wins(user_id, feed_id, candidate).await {
            Ok(updated) => updated,
            Err(err) => match classify(&err) {
                ConflictVerdict::AlreadyApplied => {
                    // A concurrent writer applied an equal-or-greater value;
                    // the outcome the caller wanted exists.
                    debug!(
                        user_id = %user_id,
                        feed_id = %feed_id,
                        candidate = %candidate,
                        error = %err,
                        "Concurrent writer won the upsert race; treating as applied"
                    );
                    true
                }
                ConflictVerdict::Transient | ConflictVerdict::Fatal => return Err(err.into()),
            },
        };

        if updated {
            self.cache_set_one(user_id, feed_id, candidate).await;
        }

        Ok(updated)
    }

    // =========================================================================
    // Best-effort cache operations
    // =========================================================================

    async fn cache_get_one(&self, user_id: &UserId, feed_id: &FeedId) -> Option<BlockIndex> {
        match timeout(self.config.cache_op_timeout, self.cache.get_one(user_id, feed_id)).await {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                warn!(user_id = %user_id, feed_id = %feed_id, error = %err, "Cache read failed");
                None
            }
            Err(_) => {
                warn!(user_id = %user_id, feed_id = %feed_id, "Cache read timed out");
                None
            }
        }
    }

    async fn cache_get_all(&self, user_id: &UserId) -> HashMap<FeedId, BlockIndex> {
        match timeout(self.config.cache_op_timeout, self.cache.get_all_for_user(user_id)).await {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                warn!(user_id = %user_id, error = %err, "Bulk cache read failed");
                HashMap::new()
            }
            Err(_) => {
                warn!(user_id = %user_id, "Bulk cache read timed out");
                HashMap::new()
            }
        }
    }

    async fn cache_set_one(&self, user_id: &UserId, feed_id: &FeedId, candidate: BlockIndex) {
        match timeout(
            self.config.cache_op_timeout,
            self.cache.set_one_max_wins(user_id, feed_id, candidate),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                warn!(
                    user_id = %user_id,
                    feed_id = %feed_id,
                    candidate = %candidate,
                    error = %err,
                    "Cache write failed; store remains authoritative"
                );
            }
            Err(_) => {
                warn!(
                    user_id = %user_id,
                    feed_id = %feed_id,
                    candidate = %candidate,
                    "Cache write timed out; store remains authoritative"
                );
            }
        }
    }

    async fn cache_set_all(&self, user_id: &UserId, positions: &HashMap<FeedId, BlockIndex>) {
        match timeout(
            self.config.cache_op_timeout,
            self.cache.set_all_for_user(user_id, positions),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(user_id = %user_id, error = %err, "Bulk cache population failed");
            }
            Err(_) => {
                warn!(user_id = %user_id, "Bulk cache population timed out");
            }
        }
    }
}

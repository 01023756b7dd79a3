//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access.
//!
//! Personal feed transactions emulate serializable isolation optimistically:
//! the transaction snapshots a version counter at begin and re-validates at
//! commit, so a concurrent creation for the same owner surfaces as
//! `StoreError::SerializationFailure` at commit time, exactly where a real
//! serializable store would report it.

use crate::error::StoreError;
use crate::repository::{PersonalFeedRepository, PersonalFeedTx, ReadPositionRepository};
use async_trait::async_trait;
use feedmark_domain::{BlockIndex, FeedId, PersonalFeed, ReadPosition, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Shared state behind the store and its open transactions
struct MemoryInner {
    positions: RwLock<HashMap<(UserId, FeedId), ReadPosition>>,
    feeds: RwLock<HashMap<UserId, PersonalFeed>>,
    feeds_version: AtomicU64,
}

/// In-memory store for testing
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                positions: RwLock::new(HashMap::new()),
                feeds: RwLock::new(HashMap::new()),
                feeds_version: AtomicU64::new(0),
            }),
        }
    }

    /// Get the number of recorded read positions
    pub fn position_count(&self) -> usize {
        self.inner.positions.read().unwrap().len()
    }

    /// Get the number of personal feeds
    pub fn personal_feed_count(&self) -> usize {
        self.inner.feeds.read().unwrap().len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.inner.positions.write().unwrap().clear();
        self.inner.feeds.write().unwrap().clear();
        self.inner.feeds_version.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Read Position Repository Implementation
// =============================================================================

#[async_trait]
impl ReadPositionRepository for MemoryStore {
    async fn get(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, StoreError> {
        let positions = self.inner.positions.read().unwrap();
        Ok(positions
            .get(&(user_id.clone(), feed_id.clone()))
            .map(|p| p.last_read_block_index))
    }

    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, StoreError> {
        let positions = self.inner.positions.read().unwrap();
        Ok(positions
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, feed), p)| (feed.clone(), p.last_read_block_index))
            .collect())
    }

    async fn upsert_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, StoreError> {
        // Compare and write under one write lock; this is the in-memory
        // equivalent of the single conditional UPDATE statement.
        let mut positions = self.inner.positions.write().unwrap();
        let key = (user_id.clone(), feed_id.clone());

        match positions.get_mut(&key) {
            Some(position) => Ok(position.advance_to(candidate)),
            None => {
                positions.insert(
                    key,
                    ReadPosition::new(user_id.clone(), feed_id.clone(), candidate),
                );
                Ok(true)
            }
        }
    }
}

// =============================================================================
// Personal Feed Repository Implementation
// =============================================================================

/// Optimistic transaction over the personal feed table
struct MemoryFeedTx {
    inner: Arc<MemoryInner>,
    snapshot_version: u64,
    pending: Option<PersonalFeed>,
}

#[async_trait]
impl PersonalFeedTx for MemoryFeedTx {
    async fn owner_exists(&mut self, owner_id: &UserId) -> Result<bool, StoreError> {
        let feeds = self.inner.feeds.read().unwrap();
        Ok(feeds.contains_key(owner_id))
    }

    async fn insert(&mut self, feed: &PersonalFeed) -> Result<(), StoreError> {
        self.pending = Some(feed.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Some(feed) = self.pending else {
            // Read-only transaction; nothing to validate.
            return Ok(());
        };

        let mut feeds = self.inner.feeds.write().unwrap();
        if feeds.contains_key(&feed.owner_id) {
            let version = self.inner.feeds_version.load(Ordering::SeqCst);
            return if version != self.snapshot_version {
                // A concurrent transaction committed this owner after our
                // snapshot: commit-time conflict.
                Err(StoreError::SerializationFailure(format!(
                    "personal feed for owner {} committed concurrently",
                    feed.owner_id
                )))
            } else {
                // The row predates the transaction: plain unique violation.
                Err(StoreError::duplicate("personal_feed", feed.owner_id.to_string()))
            };
        }

        feeds.insert(feed.owner_id.clone(), feed);
        self.inner.feeds_version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl PersonalFeedRepository for MemoryStore {
    async fn begin_serializable(&self) -> Result<Box<dyn PersonalFeedTx>, StoreError> {
        Ok(Box::new(MemoryFeedTx {
            inner: Arc::clone(&self.inner),
            snapshot_version: self.inner.feeds_version.load(Ordering::SeqCst),
            pending: None,
        }))
    }

    async fn find_by_owner(&self, owner_id: &UserId) -> Result<Option<PersonalFeed>, StoreError> {
        let feeds = self.inner.feeds.read().unwrap();
        Ok(feeds.get(owner_id).cloned())
    }
}

// =============================================================================
// Tests
// =============================================================================

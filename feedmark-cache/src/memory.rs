//! In-memory cache implementation
//!
//! Used for testing and development. Thread-safe using RwLock.

use crate::error::CacheError;
use crate::port::ReadPositionCache;
use async_trait::async_trait;
use feedmark_domain::max_wins::{resolve, MaxWinsDecision};
use feedmark_domain::{BlockIndex, FeedId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory cache keyed per user
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<UserId, HashMap<FeedId, BlockIndex>>>>,
}

impl MemoryCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove one entry out-of-band (simulates eviction in tests)
    pub fn evict_one(&self, user_id: &UserId, feed_id: &FeedId) {
        let mut entries = self.entries.write().unwrap();
        if let Some(user_entries) = entries.get_mut(user_id) {
            user_entries.remove(feed_id);
        }
    }

    /// Remove everything (simulates a cold cache in tests)
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Number of cached entries across all users
    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().values().map(HashMap::len).sum()
    }
}

#[async_trait]
impl ReadPositionCache for MemoryCache {
    async fn get_one(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, CacheError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(user_id).and_then(|feeds| feeds.get(feed_id)).copied())
    }

    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, CacheError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(user_id).cloned().unwrap_or_default())
    }

    async fn set_one_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().unwrap();
        let user_entries = entries.entry(user_id.clone()).or_default();
        let existing = user_entries.get(feed_id).copied();

        match resolve(candidate, existing) {
            MaxWinsDecision::Advance => {
                user_entries.insert(feed_id.clone(), candidate);
                Ok(true)
            }
            MaxWinsDecision::Keep => Ok(false),
        }
    }

    async fn set_all_for_user(
        &self,
        user_id: &UserId,
        positions: &HashMap<FeedId, BlockIndex>,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().unwrap();
        let user_entries = entries.entry(user_id.clone()).or_default();

        for (feed_id, candidate) in positions {
            let existing = user_entries.get(feed_id).copied();
            if resolve(*candidate, existing).should_apply() {
                user_entries.insert(feed_id.clone(), *candidate);
            }
        }

        Ok(())
    }
}

//! Test doubles and helpers shared by Feedmark integration tests.
//!
//! Everything here stands in for an external collaborator misbehaving in a
//! controlled way: a cache that is down, a store that keeps losing
//! serializable commits, a store that reports concurrency conflicts on
//! upsert. Production code never depends on this crate.

#![warn(clippy::all)]

use async_trait::async_trait;
use feedmark_cache::{CacheError, ReadPositionCache};
use feedmark_domain::{BlockIndex, FeedId, PersonalFeed, UserId};
use feedmark_store::{
    MemoryStore, PersonalFeedRepository, PersonalFeedTx, ReadPositionRepository, StoreError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Initialize tracing for tests (idempotent).
///
/// Respects `RUST_LOG`; defaults to warn so degradation paths are visible
/// when a test fails.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_test_writer()
        .try_init();
}

// =============================================================================
// FailingCache
// =============================================================================

/// A cache whose every operation fails as unavailable.
#[derive(Clone, Default)]
pub struct FailingCache {
    calls: Arc<AtomicU32>,
}

impl FailingCache {
    /// Create a new failing cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted against this cache
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("cache is down".to_string()))
    }
}

#[async_trait]
impl ReadPositionCache for FailingCache {
    async fn get_one(
        &self,
        _user_id: &UserId,
        _feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, CacheError> {
        self.fail()
    }

    async fn get_all_for_user(
        &self,
        _user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, CacheError> {
        self.fail()
    }

    async fn set_one_max_wins(
        &self,
        _user_id: &UserId,
        _feed_id: &FeedId,
        _candidate: BlockIndex,
    ) -> Result<bool, CacheError> {
        self.fail()
    }

    async fn set_all_for_user(
        &self,
        _user_id: &UserId,
        _positions: &HashMap<FeedId, BlockIndex>,
    ) -> Result<(), CacheError> {
        self.fail()
    }
}

// =============================================================================
// SerializationFailingStore
// =============================================================================

/// A personal feed store whose commits always lose the serializable race.
///
/// Counts attempts so retry-bound tests can assert the exact schedule.
#[derive(Clone, Default)]
pub struct SerializationFailingStore {
    attempts: Arc<AtomicU32>,
}

impl SerializationFailingStore {
    /// Create a new always-conflicting store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions begun against this store
    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

struct AlwaysConflictingTx;

#[async_trait]
impl PersonalFeedTx for AlwaysConflictingTx {
    async fn owner_exists(&mut self, _owner_id: &UserId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn insert(&mut self, _feed: &PersonalFeed) -> Result<(), StoreError> {
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Err(StoreError::SerializationFailure(
            "could not serialize access due to concurrent update".to_string(),
        ))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl PersonalFeedRepository for SerializationFailingStore {
    async fn begin_serializable(&self) -> Result<Box<dyn PersonalFeedTx>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(AlwaysConflictingTx))
    }

    async fn find_by_owner(&self, _owner_id: &UserId) -> Result<Option<PersonalFeed>, StoreError> {
        Ok(None)
    }
}

// =============================================================================
// ConflictInjectingStore
// =============================================================================

/// Kind of error to inject into `upsert_max_wins`.
#[derive(Debug, Clone, Copy)]
pub enum InjectedConflict {
    /// Unique constraint violation (first-ever insert race)
    Duplicate,
    /// Optimistic concurrency violation (row changed under the writer)
    ConcurrentModification,
    /// Unrecognized database failure
    Database,
}

impl InjectedConflict {
    fn to_error(self, user_id: &UserId, feed_id: &FeedId) -> StoreError {
        let key = format!("{}/{}", user_id, feed_id);
        match self {
            InjectedConflict::Duplicate => StoreError::duplicate("read_position", key),
            InjectedConflict::ConcurrentModification => {
                StoreError::concurrent_modification("read_position", key)
            }
            InjectedConflict::Database => {
                StoreError::Database("unexpected failure injected by test".to_string())
            }
        }
    }
}

/// Wraps a `MemoryStore` and fails a limited number of upserts.
///
/// Reads always pass through, so tests can assert what a concurrent writer
/// "left behind" in the underlying store.
pub struct ConflictInjectingStore {
    inner: MemoryStore,
    conflict: InjectedConflict,
    remaining_failures: AtomicU32,
}

impl ConflictInjectingStore {
    /// Fail the next `failures` upserts with the given conflict
    pub fn new(inner: MemoryStore, conflict: InjectedConflict, failures: u32) -> Self {
        Self {
            inner,
            conflict,
            remaining_failures: AtomicU32::new(failures),
        }
    }

    fn take_failure(&self) -> bool {
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl ReadPositionRepository for ConflictInjectingStore {
    async fn get(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, StoreError> {
        self.inner.get(user_id, feed_id).await
    }

    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, StoreError> {
        self.inner.get_all_for_user(user_id).await
    }

    async fn upsert_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, StoreError> {
        if self.take_failure() {
            return Err(self.conflict.to_error(user_id, feed_id));
        }
        self.inner.upsert_max_wins(user_id, feed_id, candidate).await
    }
}

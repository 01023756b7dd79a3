//! Integration tests for read position synchronization.
//!
//! Runs the real engine against the in-memory store and cache, plus testkit
//! doubles for the degradation paths.

use std::collections::HashMap;
use std::sync::Arc;

use feedmark_cache::{MemoryCache, ReadPositionCache};
use feedmark_domain::{BlockIndex, FeedId, UserId};
use feedmark_engine::{ReadPositionSyncEngine, SyncConfig};
use feedmark_store::{MemoryStore, ReadPositionRepository};
use feedmark_testkit::{init_test_tracing, ConflictInjectingStore, FailingCache, InjectedConflict};

fn user() -> UserId {
    UserId::new("user-1")
}

fn feed() -> FeedId {
    FeedId::new("feed-1").unwrap()
}

fn engine(store: MemoryStore, cache: MemoryCache) -> ReadPositionSyncEngine {
    ReadPositionSyncEngine::new(Arc::new(store), Arc::new(cache), SyncConfig::default())
}

#[tokio::test]
async fn test_max_wins_convergence_under_concurrent_markers() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = Arc::new(engine(store.clone(), cache.clone()));

    // Concurrent devices submit positions in no particular order
    let values = [5u64, 12, 1, 9, 12, 3, 8, 11];
    let mut handles = Vec::new();
    for value in values {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(value)).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // The stored value is the maximum regardless of interleaving
    assert_eq!(store.get(&user(), &feed()).await.unwrap(), Some(BlockIndex::new(12)));
    assert_eq!(engine.get_read_position(&user(), &feed()).await.unwrap(), BlockIndex::new(12));

    // And regardless of cache state
    cache.clear();
    assert_eq!(engine.get_read_position(&user(), &feed()).await.unwrap(), BlockIndex::new(12));
}

#[tokio::test]
async fn test_blank_user_returns_defaults_without_store_access() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = engine(store, cache);
    let blank = UserId::new("");

    assert_eq!(engine.get_read_position(&blank, &feed()).await.unwrap(), BlockIndex::ZERO);
    assert!(engine.get_read_positions_for_user(&blank).await.unwrap().is_empty());
    assert!(!engine.mark_feed_as_read(&blank, &feed(), BlockIndex::new(5)).await.unwrap());
}

#[tokio::test]
async fn test_unknown_user_and_feed_return_zero() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = engine(store.clone(), cache.clone());

    let position = engine
        .get_read_position(&UserId::new("nobody"), &FeedId::new("nothing").unwrap())
        .await
        .unwrap();
    assert_eq!(position, BlockIndex::ZERO);

    // A store miss must not write anything to the cache
    assert_eq!(cache.entry_count(), 0);
}

#[tokio::test]
async fn test_no_downgrade() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = engine(store.clone(), cache);

    assert!(engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(5)).await.unwrap());
    assert!(!engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(3)).await.unwrap());

    assert_eq!(engine.get_read_position(&user(), &feed()).await.unwrap(), BlockIndex::new(5));
    assert_eq!(store.get(&user(), &feed()).await.unwrap(), Some(BlockIndex::new(5)));
}

#[tokio::test]
async fn test_cache_transparency_after_eviction() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = engine(store, cache.clone());

    assert!(engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(7)).await.unwrap());

    // The cache loses the entry out-of-band
    cache.evict_one(&user(), &feed());
    assert!(cache.get_one(&user(), &feed()).await.unwrap().is_none());

    // The read is served from the store and repopulates the cache
    assert_eq!(engine.get_read_position(&user(), &feed()).await.unwrap(), BlockIndex::new(7));
    assert_eq!(cache.get_one(&user(), &feed()).await.unwrap(), Some(BlockIndex::new(7)));
}

#[tokio::test]
async fn test_bulk_read_repopulates_cold_cache() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let engine = engine(store, cache.clone());
    let feed_a = FeedId::new("feed-a").unwrap();
    let feed_b = FeedId::new("feed-b").unwrap();

    engine.mark_feed_as_read(&user(), &feed_a, BlockIndex::new(3)).await.unwrap();
    engine.mark_feed_as_read(&user(), &feed_b, BlockIndex::new(9)).await.unwrap();
    cache.clear();

    let positions = engine.get_read_positions_for_user(&user()).await.unwrap();

    let expected: HashMap<FeedId, BlockIndex> = [
        (feed_a.clone(), BlockIndex::new(3)),
        (feed_b.clone(), BlockIndex::new(9)),
    ]
    .into_iter()
    .collect();
    assert_eq!(positions, expected);

    // The bulk miss repopulated the cache as a side effect
    assert_eq!(cache.get_all_for_user(&user()).await.unwrap(), expected);
}

#[tokio::test]
async fn test_bulk_read_serves_cache_hit_without_store() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = MemoryCache::new();
    let feed_a = FeedId::new("feed-a").unwrap();

    // Cache holds a value the (empty) store has never seen; a non-empty
    // cache hit is returned as-is.
    cache.set_one_max_wins(&user(), &feed_a, BlockIndex::new(4)).await.unwrap();
    let engine = engine(store, cache);

    let positions = engine.get_read_positions_for_user(&user()).await.unwrap();
    assert_eq!(positions.get(&feed_a), Some(&BlockIndex::new(4)));
}

#[tokio::test]
async fn test_cache_failure_never_changes_results() {
    init_test_tracing();
    let store = MemoryStore::new();
    let cache = FailingCache::new();
    let engine = ReadPositionSyncEngine::new(
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        SyncConfig::default(),
    );

    // Write-through succeeds even though every cache call fails
    assert!(engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(7)).await.unwrap());
    assert_eq!(store.get(&user(), &feed()).await.unwrap(), Some(BlockIndex::new(7)));

    // Reads degrade to the store
    assert_eq!(engine.get_read_position(&user(), &feed()).await.unwrap(), BlockIndex::new(7));
    assert_eq!(
        engine.get_read_positions_for_user(&user()).await.unwrap(),
        [(feed(), BlockIndex::new(7))].into_iter().collect()
    );

    // The cache really was exercised and really did fail
    assert!(cache.call_count() >= 3);
}

#[tokio::test]
async fn test_unique_violation_on_upsert_counts_as_applied() {
    init_test_tracing();
    let store = ConflictInjectingStore::new(MemoryStore::new(), InjectedConflict::Duplicate, 1);
    let cache = MemoryCache::new();
    let engine =
        ReadPositionSyncEngine::new(Arc::new(store), Arc::new(cache), SyncConfig::default());

    // Two writers raced the first-ever insert and this one lost; a peer
    // already applied an equal-or-greater value.
    assert!(engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(5)).await.unwrap());
}

#[tokio::test]
async fn test_concurrency_violation_on_upsert_counts_as_applied() {
    init_test_tracing();
    let store = ConflictInjectingStore::new(
        MemoryStore::new(),
        InjectedConflict::ConcurrentModification,
        1,
    );
    let cache = MemoryCache::new();
    let engine =
        ReadPositionSyncEngine::new(Arc::new(store), Arc::new(cache), SyncConfig::default());

    assert!(engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(5)).await.unwrap());
}

#[tokio::test]
async fn test_unrecognized_store_error_propagates() {
    init_test_tracing();
    let store = ConflictInjectingStore::new(MemoryStore::new(), InjectedConflict::Database, 1);
    let cache = MemoryCache::new();
    let engine =
        ReadPositionSyncEngine::new(Arc::new(store), Arc::new(cache), SyncConfig::default());

    let result = engine.mark_feed_as_read(&user(), &feed(), BlockIndex::new(5)).await;
    assert!(result.is_err());
}

//! Integration tests for idempotent personal feed creation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedmark_domain::{PersonalFeed, UserId};
use feedmark_engine::{EngineError, PersonalFeedCreator, RetryConfig};
use feedmark_store::{
    MemoryStore, PersonalFeedRepository, PersonalFeedTx, StoreError,
};
use feedmark_testkit::{init_test_tracing, SerializationFailingStore};

fn owner() -> UserId {
    UserId::new("user-1")
}

#[tokio::test]
async fn test_exactly_once_creation_under_concurrent_callers() {
    init_test_tracing();
    let store = MemoryStore::new();
    let creator = Arc::new(PersonalFeedCreator::new(
        Arc::new(store.clone()),
        RetryConfig::default(),
    ));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let creator = Arc::clone(&creator);
        handles.push(tokio::spawn(async move {
            let feed = PersonalFeed::new(owner());
            creator.create_if_not_exists(&feed).await.unwrap()
        }));
    }

    let mut created_count = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created_count += 1;
        }
    }

    // Exactly one caller observed `true`, and exactly one row exists
    assert_eq!(created_count, 1);
    assert_eq!(store.personal_feed_count(), 1);
    assert!(store.find_by_owner(&owner()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_existing_owner_short_circuits_to_false() {
    init_test_tracing();
    let store = MemoryStore::new();
    let creator = PersonalFeedCreator::new(Arc::new(store.clone()), RetryConfig::default());

    let first = PersonalFeed::new(owner());
    assert!(creator.create_if_not_exists(&first).await.unwrap());

    // The second creation finds the owner inside the transaction and stops
    let second = PersonalFeed::new(owner());
    assert!(!creator.create_if_not_exists(&second).await.unwrap());

    // The original feed is untouched
    assert_eq!(store.find_by_owner(&owner()).await.unwrap(), Some(first));
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_and_backoff_schedule() {
    init_test_tracing();
    let store = SerializationFailingStore::new();
    let config = RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(50),
        overall_deadline: Duration::from_secs(5),
    };
    let creator = PersonalFeedCreator::new(Arc::new(store.clone()), config);

    let started = tokio::time::Instant::now();
    let err = creator.create_if_not_exists(&PersonalFeed::new(owner())).await.unwrap_err();

    // Fails after exactly the configured attempt cap
    assert!(matches!(err, EngineError::RetriesExhausted { attempts: 3, .. }), "got: {}", err);
    assert_eq!(store.attempt_count(), 3);

    // Backoff slept base*1 then base*2 between the three attempts
    assert_eq!(started.elapsed(), Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_overall_deadline_cuts_retries_short() {
    init_test_tracing();
    let store = SerializationFailingStore::new();
    let config = RetryConfig {
        max_attempts: 10,
        base_delay: Duration::from_millis(100),
        overall_deadline: Duration::from_millis(250),
    };
    let creator = PersonalFeedCreator::new(Arc::new(store.clone()), config);

    let err = creator.create_if_not_exists(&PersonalFeed::new(owner())).await.unwrap_err();

    // Attempt 1 fails at t=0, sleeps 100ms; attempt 2 fails at t=100ms and
    // the next 200ms backoff would cross the 250ms deadline.
    assert!(matches!(err, EngineError::DeadlineExceeded { attempts: 2 }), "got: {}", err);
    assert_eq!(store.attempt_count(), 2);
}

// =============================================================================
// Fatal store failures
// =============================================================================

/// Store whose transactions cannot even begin.
struct UnreachableStore;

#[async_trait]
impl PersonalFeedRepository for UnreachableStore {
    async fn begin_serializable(&self) -> Result<Box<dyn PersonalFeedTx>, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn find_by_owner(&self, _owner_id: &UserId) -> Result<Option<PersonalFeed>, StoreError> {
        Err(StoreError::Connection("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_fatal_store_error_propagates_without_retry() {
    init_test_tracing();
    let creator = PersonalFeedCreator::new(Arc::new(UnreachableStore), RetryConfig::default());

    let err = creator.create_if_not_exists(&PersonalFeed::new(owner())).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Connection(_))), "got: {}", err);
}

//! Idempotent personal feed creation.
//!
//! Check-then-create under serializable isolation. Any number of concurrent
//! callers for the same owner leave exactly one feed in the store; exactly
//! one caller observes `true`.

use crate::config::RetryConfig;
use crate::conflict::{classify, ConflictVerdict};
use crate::error::{EngineError, EngineResult};
use feedmark_domain::PersonalFeed;
use feedmark_store::{PersonalFeedRepository, StoreError};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Creates personal feeds at most once per owner.
pub struct PersonalFeedCreator {
    store: Arc<dyn PersonalFeedRepository>,
    config: RetryConfig,
}

impl PersonalFeedCreator {
    /// Create a creator over a personal feed store
    pub fn new(store: Arc<dyn PersonalFeedRepository>, config: RetryConfig) -> Self {
        Self { store, config }
    }

    /// Create the feed unless its owner already has one.
    ///
    /// Returns `true` for the caller whose insert committed, `false` when the
    /// feed already exists (including when a concurrent caller wins the
    /// race). Serialization failures retry the whole check-then-insert
    /// sequence with backoff, bounded by both the attempt cap and the overall
    /// deadline; exhausting either is a hard error, the one condition this
    /// subsystem does not absorb.
    pub async fn create_if_not_exists(&self, feed: &PersonalFeed) -> EngineResult<bool> {
        let deadline = Instant::now() + self.config.overall_deadline;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let err = match self.try_create(feed).await {
                Ok(created) => return Ok(created),
                Err(err) => err,
            };

            match classify(&err) {
                ConflictVerdict::AlreadyApplied => {
                    // A concurrent caller's insert committed first.
                    debug!(
                        owner_id = %feed.owner_id,
                        error = %err,
                        "Personal feed already created by a concurrent writer"
                    );
                    return Ok(false);
                }
                ConflictVerdict::Fatal => return Err(err.into()),
                ConflictVerdict::Transient => {
                    if attempt >= self.config.max_attempts {
                        warn!(
                            owner_id = %feed.owner_id,
                            attempts = attempt,
                            error = %err,
                            "Personal feed creation retries exhausted"
                        );
                        return Err(EngineError::RetriesExhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }

                    let delay = self.config.base_delay * attempt;
                    if Instant::now() + delay >= deadline {
                        warn!(
                            owner_id = %feed.owner_id,
                            attempts = attempt,
                            "Personal feed creation deadline exceeded"
                        );
                        return Err(EngineError::DeadlineExceeded { attempts: attempt });
                    }

                    debug!(
                        owner_id = %feed.owner_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Serialization conflict; retrying creation"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// One check-then-insert attempt inside a serializable transaction.
    async fn try_create(&self, feed: &PersonalFeed) -> Result<bool, StoreError> {
        let mut tx = self.store.begin_serializable().await?;

        if tx.owner_exists(&feed.owner_id).await? {
            // The expected, race-free outcome when a previous attempt or a
            // concurrent caller already committed.
            tx.rollback().await?;
            return Ok(false);
        }

        if let Err(err) = tx.insert(feed).await {
            let _ = tx.rollback().await;
            return Err(err);
        }

        tx.commit().await?;
        Ok(true)
    }
}

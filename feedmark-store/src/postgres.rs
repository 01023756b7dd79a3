//! PostgreSQL store implementation.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.
//!
//! # Schema
//!
//! ```text
//! read_positions (
//!     user_id                TEXT        NOT NULL,
//!     feed_id                TEXT        NOT NULL,
//!     last_read_block_index  BIGINT      NOT NULL,
//!     updated_at             TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (user_id, feed_id)
//! )
//!
//! personal_feeds (
//!     owner_id    TEXT        PRIMARY KEY,
//!     feed_id     TEXT        NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL
//! )
//! ```
//!
//! The max-wins comparison runs inside a single conditional upsert statement,
//! never as a read-then-write pair, so concurrent markers for the same
//! `(user_id, feed_id)` resolve inside PostgreSQL's own row locking.

use crate::error::StoreError;
use crate::repository::{PersonalFeedRepository, PersonalFeedTx, ReadPositionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedmark_domain::{BlockIndex, FeedId, PersonalFeed, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use tracing::debug;

/// PostgreSQL-backed store for read positions and personal feeds
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PostgreSQL store around a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Convert a BlockIndex to the BIGINT column representation
fn block_index_to_i64(index: BlockIndex) -> Result<i64, StoreError> {
    i64::try_from(index.value())
        .map_err(|_| StoreError::Database(format!("block index {} exceeds bigint range", index)))
}

/// Convert a BIGINT column value back to a BlockIndex
fn block_index_from_i64(raw: i64) -> Result<BlockIndex, StoreError> {
    u64::try_from(raw)
        .map(BlockIndex::new)
        .map_err(|_| StoreError::Database(format!("negative block index {} in store", raw)))
}

// =============================================================================
// Read Position Repository Implementation
// =============================================================================

#[async_trait]
impl ReadPositionRepository for PgStore {
    async fn get(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
    ) -> Result<Option<BlockIndex>, StoreError> {
        let raw: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT last_read_block_index
            FROM read_positions
            WHERE user_id = $1 AND feed_id = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(feed_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(block_index_from_i64).transpose()
    }

    async fn get_all_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<FeedId, BlockIndex>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT feed_id, last_read_block_index
            FROM read_positions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut positions = HashMap::with_capacity(rows.len());
        for row in rows {
            let feed_id: String = row.try_get("feed_id").map_err(StoreError::from)?;
            let raw: i64 = row.try_get("last_read_block_index").map_err(StoreError::from)?;
            positions.insert(FeedId::new(feed_id)?, block_index_from_i64(raw)?);
        }

        Ok(positions)
    }

    async fn upsert_max_wins(
        &self,
        user_id: &UserId,
        feed_id: &FeedId,
        candidate: BlockIndex,
    ) -> Result<bool, StoreError> {
        // Insert-or-advance in one statement. The WHERE clause is the SQL
        // encoding of the domain max-wins rule: an equal or smaller candidate
        // updates zero rows.
        let result = sqlx::query(
            r#"
            INSERT INTO read_positions (user_id, feed_id, last_read_block_index, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, feed_id) DO UPDATE
            SET last_read_block_index = EXCLUDED.last_read_block_index,
                updated_at = NOW()
            WHERE read_positions.last_read_block_index < EXCLUDED.last_read_block_index
            "#,
        )
        .bind(user_id.as_str())
        .bind(feed_id.as_str())
        .bind(block_index_to_i64(candidate)?)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;

        debug!(
            user_id = %user_id,
            feed_id = %feed_id,
            candidate = %candidate,
            updated,
            "Read position upsert"
        );

        Ok(updated)
    }
}

// =============================================================================
// Personal Feed Repository Implementation
// =============================================================================

/// Serializable PostgreSQL transaction over personal feeds
struct PgFeedTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PersonalFeedTx for PgFeedTx {
    async fn owner_exists(&mut self, owner_id: &UserId) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM personal_feeds WHERE owner_id = $1)",
        )
        .bind(owner_id.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert(&mut self, feed: &PersonalFeed) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO personal_feeds (owner_id, feed_id, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(feed.owner_id.as_str())
        .bind(feed.feed_id.as_str())
        .bind(feed.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl PersonalFeedRepository for PgStore {
    async fn begin_serializable(&self) -> Result<Box<dyn PersonalFeedTx>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgFeedTx { tx }))
    }

    async fn find_by_owner(&self, owner_id: &UserId) -> Result<Option<PersonalFeed>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT owner_id, feed_id, created_at
            FROM personal_feeds
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let owner: String = row.try_get("owner_id").map_err(StoreError::from)?;
        let feed_id: String = row.try_get("feed_id").map_err(StoreError::from)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(StoreError::from)?;

        Ok(Some(PersonalFeed {
            feed_id: FeedId::new(feed_id)?,
            owner_id: UserId::new(owner),
            created_at,
        }))
    }
}

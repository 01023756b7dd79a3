//! Read Position Entity

use crate::ids::{BlockIndex, FeedId, UserId};
use crate::max_wins::{resolve, MaxWinsDecision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's read position within one feed.
///
/// Keyed by `(user_id, feed_id)`. The position is a max-register: for a fixed
/// key, `last_read_block_index` never decreases across the entity's lifetime.
/// `updated_at` is informational only and never participates in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPosition {
    /// Owner of the position
    pub user_id: UserId,
    /// Feed the position applies to
    pub feed_id: FeedId,
    /// Highest block index the user has read in this feed
    pub last_read_block_index: BlockIndex,
    /// When the position last advanced (informational)
    pub updated_at: DateTime<Utc>,
}

impl ReadPosition {
    /// Create a position at its first recorded value
    pub fn new(user_id: UserId, feed_id: FeedId, last_read_block_index: BlockIndex) -> Self {
        Self {
            user_id,
            feed_id,
            last_read_block_index,
            updated_at: Utc::now(),
        }
    }

    /// Advance the position if the candidate wins under max-wins.
    ///
    /// Returns `true` when the position moved. An equal or smaller candidate
    /// leaves the entity untouched, including `updated_at`.
    pub fn advance_to(&mut self, candidate: BlockIndex) -> bool {
        match resolve(candidate, Some(self.last_read_block_index)) {
            MaxWinsDecision::Advance => {
                self.last_read_block_index = candidate;
                self.updated_at = Utc::now();
                true
            }
            MaxWinsDecision::Keep => false,
        }
    }
}

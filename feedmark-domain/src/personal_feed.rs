//! Personal Feed Entity

use crate::ids::{FeedId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's personal feed.
///
/// Exactly one exists per owner; the durable store enforces this with a
/// uniqueness constraint on `owner_id`, and creation goes through the
/// idempotent check-then-create protocol. The entity is never mutated or
/// deleted by this subsystem once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalFeed {
    /// Identifier of the feed itself
    pub feed_id: FeedId,
    /// Owner; unique across all personal feeds
    pub owner_id: UserId,
    /// When the feed was created
    pub created_at: DateTime<Utc>,
}

impl PersonalFeed {
    /// Create a new personal feed for an owner with a freshly minted id
    pub fn new(owner_id: UserId) -> Self {
        Self {
            feed_id: FeedId::new_unique(),
            owner_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed_gets_unique_id() {
        let owner = UserId::new("user-1");
        let a = PersonalFeed::new(owner.clone());
        let b = PersonalFeed::new(owner);
        assert_ne!(a.feed_id, b.feed_id);
    }
}

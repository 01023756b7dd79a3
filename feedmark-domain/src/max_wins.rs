//! Max-Wins Resolution (Pure Functions)
//!
//! This module contains the pure comparison rule that makes a read position
//! a max-register: a candidate value is applied only when it is strictly
//! greater than whatever is already recorded, so concurrent writers can never
//! regress the position.
//!
//! The same function is used against the durable store and the cache. Both
//! write paths must call it (or encode the identical comparison, as the
//! PostgreSQL upsert does in SQL) so the two sides cannot drift.
//!
//! Key invariants:
//! - Absent existing value: candidate always wins
//! - Equal values: no update (callers can distinguish a real write from a
//!   redundant one)
//! - Smaller candidate: no update

use crate::ids::BlockIndex;

/// Outcome of resolving a candidate against an existing position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxWinsDecision {
    /// Candidate wins; the stored value should advance to it
    Advance,
    /// Existing value stands; nothing to write
    Keep,
}

impl MaxWinsDecision {
    /// True when the candidate should be written
    pub fn should_apply(&self) -> bool {
        matches!(self, MaxWinsDecision::Advance)
    }
}

/// Resolve a candidate read position against the existing one.
///
/// # Arguments
///
/// * `candidate` - The incoming position from a device
/// * `existing` - The currently recorded position, if any
///
/// # Returns
///
/// * `MaxWinsDecision::Advance` - existing is absent or candidate is strictly greater
/// * `MaxWinsDecision::Keep` - candidate is equal or smaller; a no-op, not an error
pub fn resolve(candidate: BlockIndex, existing: Option<BlockIndex>) -> MaxWinsDecision {
    match existing {
        None => MaxWinsDecision::Advance,
        Some(current) if candidate > current => MaxWinsDecision::Advance,
        Some(_) => MaxWinsDecision::Keep,
    }
}

//! Feedmark Engine Layer
//!
//! Orchestrates read-position synchronization and personal feed creation on
//! top of the storage and cache ports.
//!
//! # Components
//!
//! - **ReadPositionSyncEngine**: cache-aside reads and write-through writes
//!   of read positions, with graceful degradation when the cache fails
//! - **PersonalFeedCreator**: exactly-one creation of a user's personal feed
//!   under concurrent requests, with bounded retry on commit conflicts
//! - **Conflict classification**: one total function mapping low-level store
//!   failure signals to high-level outcomes, replacing scattered error
//!   filters at call sites

#![warn(clippy::all)]

// Modules
mod config;
mod conflict;
mod creator;
mod error;
mod sync;

// Re-exports
pub use config::{RetryConfig, SyncConfig};
pub use conflict::{classify, ConflictVerdict};
pub use creator::PersonalFeedCreator;
pub use error::{EngineError, EngineResult};
pub use sync::ReadPositionSyncEngine;

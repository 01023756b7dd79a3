//! Feedmark Storage Layer
//!
//! Provides persistence for read positions and personal feeds.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **In-memory store**: Fast implementation for testing
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! The durable store is the single source of truth. Its two concurrency
//! primitives carry the whole correctness burden of the system:
//!
//! - `upsert_max_wins` applies a candidate read position atomically, so
//!   concurrent markers for the same `(user, feed)` pair are race-free
//!   without any external locking.
//! - `begin_serializable` opens a serializable transaction for the
//!   check-then-create protocol on personal feeds; conflicts surface at
//!   commit time as `StoreError::SerializationFailure`.

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{PersonalFeedRepository, PersonalFeedTx, ReadPositionRepository};

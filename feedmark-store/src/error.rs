//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound {
        /// Type of entity (read position, personal feed)
        entity_type: String,
        /// Entity key
        key: String,
    },

    /// Unique constraint violation: another writer already inserted this row
    #[error("Duplicate entity: {entity_type} with key {key}")]
    Duplicate {
        /// Type of entity
        entity_type: String,
        /// Entity key
        key: String,
    },

    /// Optimistic concurrency violation: the row changed under the writer
    #[error("Concurrent modification of {entity_type} with key {key}")]
    ConcurrentModification {
        /// Type of entity
        entity_type: String,
        /// Entity key
        key: String,
    },

    /// Serializable transaction failed to commit because a concurrent
    /// transaction won the conflict
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction handle was used after commit or rollback
    #[error("Transaction already closed: {0}")]
    TransactionClosed(String),

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] feedmark_domain::DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    /// Create a concurrent modification error
    pub fn concurrent_modification(
        entity_type: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::ConcurrentModification {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity_type: "unknown".to_string(),
                key: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                // 23505: unique constraint violation
                // 40001: serialization failure under SERIALIZABLE isolation
                match db_err.code().as_deref() {
                    Some("23505") => StoreError::Duplicate {
                        entity_type: "unknown".to_string(),
                        key: "unknown".to_string(),
                    },
                    Some("40001") => StoreError::SerializationFailure(db_err.to_string()),
                    _ => StoreError::Database(db_err.to_string()),
                }
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}

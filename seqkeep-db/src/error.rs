//! Error types for the SQLite store.

use seqkeep_engine::StoreError;
use thiserror::Error;

/// Result type for SQLite store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in SQLite store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization of the JSON payload failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into a record.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A query or table definition does not fit the table layout.
    #[error("layout error: {0}")]
    Layout(String),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("connection lock poisoned")]
    Poisoned,
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::new(e)
    }
}

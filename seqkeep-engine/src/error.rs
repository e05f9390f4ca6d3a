//! Error types for sequence operations.

use seqkeep_model::{ConfigError, RecordId};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Result type for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Result type for record store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which neighbour a swap was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Previous => f.write_str("previous"),
            Direction::Next => f.write_str("next"),
        }
    }
}

/// Errors that can occur in sequence operations.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// Configuration lookup or resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A swap found no neighbour and the entity type raises on boundaries.
    #[error("no {direction} record in partition of {key}")]
    NotFound { direction: Direction, key: RecordId },

    /// A move target outside the partition, with boundary errors enabled.
    #[error("position {position} is outside {first}..={last}")]
    OutOfRange { position: i64, first: i64, last: i64 },

    /// The entity has no sequence value yet.
    #[error("record {0} has no sequence assigned")]
    Unassigned(RecordId),

    /// Error from the record store, passed through as-is.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error raised by a [`RecordStore`](crate::RecordStore) backend.
///
/// Display and `source()` are the backend error's own; this type only erases
/// the concrete backend so the engine stays generic.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(Box<dyn StdError + Send + Sync + 'static>);

impl StoreError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }

    /// A store error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// The backend error, if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.0
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

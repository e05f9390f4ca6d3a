//! SQLite storage for seqkeep.
//!
//! [`SqliteStore`] implements the engine's record store over a relational
//! table described by a [`TableLayout`]. Range queries, maxima and bulk
//! shifts become single SQL statements, and every engine operation maps to
//! one `BEGIN IMMEDIATE` transaction.

mod error;
mod layout;
mod store;

pub use error::{DbError, DbResult};
pub use layout::{TableLayout, DATA_COLUMN, DEFAULT_KEY_COLUMN, ENTITY_TYPE_COLUMN};
pub use store::SqliteStore;

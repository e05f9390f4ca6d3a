//! Dense sequence maintenance for seqkeep.
//!
//! Keeps an integer ordering over the rows of a table contiguous and
//! duplicate-free within each partition while rows are inserted, deleted,
//! swapped with a neighbour, or moved to an arbitrary position:
//!
//! - [`SequenceEngine`]: the per-call orchestrator
//! - [`RecordStore`]: the persistence operations it needs
//! - [`Scope`] / [`SequenceQuery`]: group-scoped range queries over the sequence field
//! - [`MemoryStore`]: an in-memory store with exact rollback
//! - [`DensityReport`]: gaps and duplicates found by [`SequenceEngine::audit`]
//!
//! The engine only touches rows strictly between an entity's old and new
//! position. It holds no locks and caches nothing; isolation between
//! concurrent callers comes from the store's transactions.

mod density;
mod error;
mod memory;
mod scope;
mod sequence;
mod store;
mod txn;

pub use density::DensityReport;
pub use error::{Direction, SequenceError, SequenceResult, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use scope::scope_for;
pub use sequence::SequenceEngine;
pub use store::{RecordStore, Scope, SequenceQuery, SortOrder};

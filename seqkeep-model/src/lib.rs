//! Record model and sequence configuration for seqkeep.
//!
//! Defines the types every other seqkeep crate depends on:
//! - [`Record`] and [`RecordId`]: the generic row and its primary key
//! - [`FieldValue`]: scalar group-key values that define a partition
//! - [`SequenceConfig`]: per-entity-type options resolved over defaults
//! - [`SequenceAccessor`]: typed get/set of the sequence field and group attributes
//! - [`SequenceRegistry`]: binds configuration and accessor to an entity type at startup

mod accessor;
pub mod config;
mod error;
mod ids;
mod record;
mod registry;
mod value;

pub use accessor::{JsonFieldAccessor, SequenceAccessor};
pub use config::{SequenceConfig, SequenceOptions};
pub use error::{ConfigError, ConfigResult};
pub use ids::RecordId;
pub use record::Record;
pub use registry::{Registration, SequenceRegistry};
pub use value::FieldValue;

/// The first stored sequence value of every partition.
///
/// Caller-facing positions may start at 0 or 1 (see
/// [`SequenceConfig::start`]); stored values always start here.
pub const FIRST_SEQUENCE: i64 = 1;

//! The record store abstraction the engine runs against.

use crate::error::StoreResult;
use seqkeep_model::FieldValue;
use std::ops::{Bound, RangeBounds};

/// A group-scoped view over one table.
///
/// Holds the sequence field name, the entity type when the table holds
/// several, and one equality predicate per group attribute. No type and an
/// empty `group` is the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub field: String,
    pub entity_type: Option<String>,
    pub group: Vec<(String, FieldValue)>,
}

impl Scope {
    /// The whole table, ordered by `field`.
    pub fn whole(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entity_type: None,
            group: Vec::new(),
        }
    }

    /// Restricts the scope to rows of one entity type.
    pub fn of_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// True when the scope admits rows of the given entity type.
    pub fn matches_type(&self, entity_type: Option<&str>) -> bool {
        self.entity_type
            .as_deref()
            .is_none_or(|scoped| entity_type == Some(scoped))
    }

    /// Adds an equality predicate on a group attribute.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.group.push((attribute.into(), value.into()));
        self
    }

    /// True when `lookup` yields the scoped value for every group attribute.
    pub fn matches(&self, lookup: impl Fn(&str) -> FieldValue) -> bool {
        self.group
            .iter()
            .all(|(attribute, value)| lookup(attribute) == *value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A range query over the sequence field within a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceQuery {
    pub scope: Scope,
    pub lower: Bound<i64>,
    pub upper: Bound<i64>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl SequenceQuery {
    /// Every row in the scope, ascending by sequence.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    /// `sequence > value`
    pub fn above(mut self, value: i64) -> Self {
        self.lower = Bound::Excluded(value);
        self
    }

    /// `sequence >= value`
    pub fn at_least(mut self, value: i64) -> Self {
        self.lower = Bound::Included(value);
        self
    }

    /// `sequence < value`
    pub fn below(mut self, value: i64) -> Self {
        self.upper = Bound::Excluded(value);
        self
    }

    /// `sequence <= value`
    pub fn at_most(mut self, value: i64) -> Self {
        self.upper = Bound::Included(value);
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a sequence value falls inside the query's bounds.
    pub fn contains(&self, sequence: i64) -> bool {
        (self.lower, self.upper).contains(&sequence)
    }
}

/// Persistence operations the sequence engine needs.
///
/// Every call may block on I/O. Implementations decide what a transaction
/// means for them; the engine opens at most one per public operation and
/// never nests them.
pub trait RecordStore<E> {
    /// Largest sequence value in the scope, `None` when it has no rows.
    fn max_sequence(&self, scope: &Scope) -> StoreResult<Option<i64>>;

    /// Persisted rows matching the query, in the query's order.
    ///
    /// Rows with no sequence value only match an unbounded query.
    fn find(&self, query: &SequenceQuery) -> StoreResult<Vec<E>>;

    /// First row matching the query, in the query's order.
    fn first(&self, query: &SequenceQuery) -> StoreResult<Option<E>> {
        let query = query.clone().limit(1);
        Ok(self.find(&query)?.into_iter().next())
    }

    /// Adds `delta` to the sequence of every row matching the query,
    /// returning the number of rows written.
    fn shift(&self, query: &SequenceQuery, delta: i64) -> StoreResult<u64>;

    /// Writes the entity's current field values, inserting it if new.
    fn persist(&self, entity: &E) -> StoreResult<()>;

    fn delete(&self, entity: &E) -> StoreResult<()>;

    fn begin(&self) -> StoreResult<()>;

    fn commit(&self) -> StoreResult<()>;

    fn rollback(&self) -> StoreResult<()>;
}

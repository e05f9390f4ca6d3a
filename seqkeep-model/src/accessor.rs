use crate::{FieldValue, Record, RecordId, SequenceConfig};

/// Typed access to the sequence-relevant attributes of an entity type.
///
/// Bound once per entity type at registration; the engine never looks
/// attributes up by name on its own.
pub trait SequenceAccessor<E>: Send + Sync {
    /// Primary key used for every write.
    fn key(&self, entity: &E) -> RecordId;

    /// Current sequence value, or `None` when not yet assigned.
    fn sequence(&self, entity: &E) -> Option<i64>;

    fn set_sequence(&self, entity: &mut E, value: i64);

    /// Value of a group attribute; missing attributes read as `Null`.
    fn group_value(&self, entity: &E, attribute: &str) -> FieldValue;

    /// Entity type name, for stores that keep several types in one table.
    /// Rows of different types never share a partition.
    fn entity_type<'e>(&self, _entity: &'e E) -> Option<&'e str> {
        None
    }
}

/// Accessor for [`Record`]s, reading top-level keys of `data`.
///
/// A stored `0` or `null` sequence reads as unassigned: stored sequences
/// start at 1, so 0 only ever appears in rows written before assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFieldAccessor {
    field_name: String,
}

impl JsonFieldAccessor {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
        }
    }

    pub fn for_config(config: &SequenceConfig) -> Self {
        Self::new(config.field_name.clone())
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

impl SequenceAccessor<Record> for JsonFieldAccessor {
    fn key(&self, entity: &Record) -> RecordId {
        entity.id
    }

    fn sequence(&self, entity: &Record) -> Option<i64> {
        entity.get_i64(&self.field_name).filter(|seq| *seq != 0)
    }

    fn set_sequence(&self, entity: &mut Record, value: i64) {
        entity.set(&self.field_name, value);
    }

    fn group_value(&self, entity: &Record, attribute: &str) -> FieldValue {
        entity.field_value(attribute)
    }

    fn entity_type<'e>(&self, entity: &'e Record) -> Option<&'e str> {
        Some(&entity.entity_type)
    }
}

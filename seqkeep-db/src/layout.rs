//! Table layout: which columns hold the key, the sequence and the group
//! attributes of a record.

use crate::error::{DbError, DbResult};
use seqkeep_model::SequenceConfig;

pub const DEFAULT_KEY_COLUMN: &str = "id";
pub const ENTITY_TYPE_COLUMN: &str = "entity_type";
pub const DATA_COLUMN: &str = "data";

/// Column layout of one sequenced table.
///
/// The sequence and every group attribute get a real column so the engine's
/// range queries and bulk shifts run as plain SQL. All other attributes stay
/// in the JSON `data` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub table: String,
    pub key_column: String,
    pub sequence_column: String,
    pub group_columns: Vec<String>,
}

impl TableLayout {
    pub fn new(table: impl Into<String>, sequence_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            sequence_column: sequence_column.into(),
            group_columns: Vec::new(),
        }
    }

    /// Layout for an entity type's resolved configuration.
    pub fn for_config(table: impl Into<String>, config: &SequenceConfig) -> Self {
        Self {
            group_columns: config.group.clone(),
            ..Self::new(table, config.field_name.clone())
        }
    }

    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    pub fn with_group_column(mut self, column: impl Into<String>) -> Self {
        self.group_columns.push(column.into());
        self
    }

    pub fn has_group_column(&self, column: &str) -> bool {
        self.group_columns.iter().any(|c| c == column)
    }

    /// Rejects empty names and columns that collide with each other.
    pub fn validate(&self) -> DbResult<()> {
        if self.table.is_empty() {
            return Err(DbError::Layout("table name is empty".into()));
        }
        let mut seen: Vec<&str> = vec![ENTITY_TYPE_COLUMN, DATA_COLUMN];
        let columns = [&self.key_column, &self.sequence_column]
            .into_iter()
            .chain(self.group_columns.iter());
        for column in columns {
            if column.is_empty() {
                return Err(DbError::Layout(format!("empty column name in {}", self.table)));
            }
            if seen.contains(&column.as_str()) {
                return Err(DbError::Layout(format!(
                    "column {column} used twice in {}",
                    self.table
                )));
            }
            seen.push(column);
        }
        Ok(())
    }
}

/// Double-quotes an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

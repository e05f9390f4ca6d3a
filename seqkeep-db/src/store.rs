//! SQLite-backed record store.
//!
//! One table per layout. The key, entity type, sequence and group attributes
//! are real columns; everything else is kept as a JSON payload in `data`.
//! The sequence lives only in its column so bulk shifts never leave the
//! payload stale.
//!
//! Group columns hold the canonical JSON text of each key (`1`, `true`,
//! `"1"`, `1.5`), so keys of different JSON types never compare equal.
//! Null keys are SQL `NULL`.

use crate::error::{DbError, DbResult};
use crate::layout::{quote_ident, TableLayout, DATA_COLUMN, ENTITY_TYPE_COLUMN};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use seqkeep_engine::{RecordStore, Scope, SequenceQuery, SortOrder, StoreResult};
use seqkeep_model::{FieldValue, JsonFieldAccessor, Record, RecordId, SequenceAccessor};
use std::ops::Bound;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`RecordStore`] over one SQLite table.
///
/// Clones share the connection, and with it any open transaction. Writers
/// that must not interleave should each open their own store on the same
/// file; `begin` takes SQLite's write lock up front.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    layout: Arc<TableLayout>,
    accessor: JsonFieldAccessor,
}

struct StoredRow {
    key: String,
    entity_type: String,
    sequence: Option<i64>,
    data: String,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>, layout: TableLayout) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_connection(conn, layout)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(layout: TableLayout) -> DbResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, layout)
    }

    fn with_connection(conn: Connection, layout: TableLayout) -> DbResult<Self> {
        layout.validate()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            accessor: JsonFieldAccessor::new(layout.sequence_column.clone()),
            layout: Arc::new(layout),
        };
        store.init_schema()?;
        debug!("Opened sequence table {}", store.layout.table);
        Ok(store)
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn init_schema(&self) -> DbResult<()> {
        let layout = &self.layout;
        let table = quote_ident(&layout.table);
        let seq = quote_ident(&layout.sequence_column);

        let mut columns = vec![
            format!("{} TEXT PRIMARY KEY", quote_ident(&layout.key_column)),
            format!("{} TEXT NOT NULL", quote_ident(ENTITY_TYPE_COLUMN)),
            format!("{seq} INTEGER"),
        ];
        columns.extend(
            layout
                .group_columns
                .iter()
                .map(|c| format!("{} TEXT", quote_ident(c))),
        );
        columns.push(format!("{} TEXT NOT NULL", quote_ident(DATA_COLUMN)));

        let index_columns: Vec<String> = std::iter::once(quote_ident(ENTITY_TYPE_COLUMN))
            .chain(layout.group_columns.iter().map(|c| quote_ident(c)))
            .chain(std::iter::once(seq))
            .collect();
        let index = quote_ident(&format!("{}_sequence_idx", layout.table));

        self.conn()?.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} ({columns});
             CREATE INDEX IF NOT EXISTS {index} ON {table} ({index_columns});",
            columns = columns.join(", "),
            index_columns = index_columns.join(", "),
        ))?;
        Ok(())
    }

    // ── Convenience reads ────────────────────────────────────────

    /// Loads one record by key.
    pub fn load(&self, id: &RecordId) -> DbResult<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            self.select_columns(),
            quote_ident(&self.layout.table),
            quote_ident(&self.layout.key_column),
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id.to_string()], read_row)?;
        match rows.next() {
            Some(row) => Ok(Some(self.to_record(row?)?)),
            None => Ok(None),
        }
    }

    /// All records of an entity type, grouped by partition and in sequence
    /// order within each.
    pub fn list(&self, entity_type: &str) -> DbResult<Vec<Record>> {
        let order: Vec<String> = self
            .layout
            .group_columns
            .iter()
            .chain([&self.layout.sequence_column, &self.layout.key_column])
            .map(|c| quote_ident(c))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
            self.select_columns(),
            quote_ident(&self.layout.table),
            quote_ident(ENTITY_TYPE_COLUMN),
            order.join(", "),
        );
        self.query_records(&sql, vec![Value::Text(entity_type.to_string())])
    }

    /// Number of rows in the table.
    pub fn count(&self) -> DbResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.layout.table));
        let count: i64 = self.conn()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ── Query building ───────────────────────────────────────────

    fn select_columns(&self) -> String {
        [
            self.layout.key_column.as_str(),
            ENTITY_TYPE_COLUMN,
            self.layout.sequence_column.as_str(),
            DATA_COLUMN,
        ]
        .map(quote_ident)
        .join(", ")
    }

    /// Rejects scopes naming columns this table does not have.
    fn check_scope(&self, scope: &Scope) -> DbResult<()> {
        if scope.field != self.layout.sequence_column {
            return Err(DbError::Layout(format!(
                "table {} orders by {}, not {}",
                self.layout.table, self.layout.sequence_column, scope.field
            )));
        }
        for (attribute, _) in &scope.group {
            if !self.layout.has_group_column(attribute) {
                return Err(DbError::Layout(format!(
                    "table {} has no group column {attribute}",
                    self.layout.table
                )));
            }
        }
        Ok(())
    }

    /// `WHERE` clause and its bound values for a query's scope and range.
    fn filter(&self, query: &SequenceQuery) -> DbResult<(String, Vec<Value>)> {
        self.check_scope(&query.scope)?;
        let seq = quote_ident(&self.layout.sequence_column);
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(entity_type) = &query.scope.entity_type {
            clauses.push(format!("{} = ?", quote_ident(ENTITY_TYPE_COLUMN)));
            values.push(Value::Text(entity_type.clone()));
        }
        for (attribute, value) in &query.scope.group {
            clauses.push(format!("{} IS ?", quote_ident(attribute)));
            values.push(sql_value(value));
        }
        match query.lower {
            Bound::Included(v) => {
                clauses.push(format!("{seq} >= ?"));
                values.push(Value::Integer(v));
            }
            Bound::Excluded(v) => {
                clauses.push(format!("{seq} > ?"));
                values.push(Value::Integer(v));
            }
            Bound::Unbounded => {}
        }
        match query.upper {
            Bound::Included(v) => {
                clauses.push(format!("{seq} <= ?"));
                values.push(Value::Integer(v));
            }
            Bound::Excluded(v) => {
                clauses.push(format!("{seq} < ?"));
                values.push(Value::Integer(v));
            }
            Bound::Unbounded => {}
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        Ok((sql, values))
    }

    fn query_records(&self, sql: &str, values: Vec<Value>) -> DbResult<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(self.to_record(row?)?);
        }
        Ok(records)
    }

    fn to_record(&self, row: StoredRow) -> DbResult<Record> {
        let id = RecordId::parse(&row.key)
            .map_err(|e| DbError::InvalidData(format!("invalid record id {}: {e}", row.key)))?;
        let data: serde_json::Value = serde_json::from_str(&row.data)?;
        let mut record = Record::with_id(id, row.entity_type, data);
        if let Some(seq) = row.sequence {
            record.set(&self.layout.sequence_column, seq);
        }
        Ok(record)
    }

    // ── Statements ───────────────────────────────────────────────

    fn max_in(&self, scope: &Scope) -> DbResult<Option<i64>> {
        let (filter, values) = self.filter(&SequenceQuery::new(scope.clone()))?;
        let sql = format!(
            "SELECT MAX({}) FROM {}{filter}",
            quote_ident(&self.layout.sequence_column),
            quote_ident(&self.layout.table),
        );
        let max = self
            .conn()?
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(max)
    }

    fn find_in(&self, query: &SequenceQuery) -> DbResult<Vec<Record>> {
        let (filter, mut values) = self.filter(query)?;
        let direction = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let mut sql = format!(
            "SELECT {} FROM {}{filter} ORDER BY {seq} {direction}, {key} {direction}",
            self.select_columns(),
            quote_ident(&self.layout.table),
            seq = quote_ident(&self.layout.sequence_column),
            key = quote_ident(&self.layout.key_column),
        );
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }
        self.query_records(&sql, values)
    }

    fn shift_in(&self, query: &SequenceQuery, delta: i64) -> DbResult<u64> {
        let (filter, filter_values) = self.filter(query)?;
        let sql = format!(
            "UPDATE {} SET {seq} = {seq} + ?{filter}",
            quote_ident(&self.layout.table),
            seq = quote_ident(&self.layout.sequence_column),
        );
        let values = std::iter::once(Value::Integer(delta)).chain(filter_values);
        let changed = self.conn()?.execute(&sql, params_from_iter(values))?;
        Ok(changed as u64)
    }

    fn upsert(&self, record: &Record) -> DbResult<()> {
        let layout = &self.layout;
        let mut payload = record.data.clone();
        if let Some(map) = payload.as_object_mut() {
            map.remove(&layout.sequence_column);
        }

        let mut columns = vec![
            quote_ident(&layout.key_column),
            quote_ident(ENTITY_TYPE_COLUMN),
            quote_ident(&layout.sequence_column),
        ];
        let mut values = vec![
            Value::Text(record.id.to_string()),
            Value::Text(record.entity_type.clone()),
            self.accessor
                .sequence(record)
                .map_or(Value::Null, Value::Integer),
        ];
        for column in &layout.group_columns {
            columns.push(quote_ident(column));
            values.push(sql_value(&record.field_value(column)));
        }
        columns.push(quote_ident(DATA_COLUMN));
        values.push(Value::Text(serde_json::to_string(&payload)?));

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({placeholders})",
            quote_ident(&layout.table),
            columns.join(", "),
        );
        self.conn()?.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn delete_row(&self, record: &Record) -> DbResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(&self.layout.table),
            quote_ident(&self.layout.key_column),
        );
        self.conn()?.execute(&sql, params![record.id.to_string()])?;
        Ok(())
    }

    fn control(&self, statement: &str) -> DbResult<()> {
        self.conn()?.execute_batch(statement)?;
        Ok(())
    }
}

impl RecordStore<Record> for SqliteStore {
    fn max_sequence(&self, scope: &Scope) -> StoreResult<Option<i64>> {
        Ok(self.max_in(scope)?)
    }

    fn find(&self, query: &SequenceQuery) -> StoreResult<Vec<Record>> {
        Ok(self.find_in(query)?)
    }

    fn shift(&self, query: &SequenceQuery, delta: i64) -> StoreResult<u64> {
        Ok(self.shift_in(query, delta)?)
    }

    fn persist(&self, entity: &Record) -> StoreResult<()> {
        Ok(self.upsert(entity)?)
    }

    fn delete(&self, entity: &Record) -> StoreResult<()> {
        Ok(self.delete_row(entity)?)
    }

    fn begin(&self) -> StoreResult<()> {
        Ok(self.control("BEGIN IMMEDIATE")?)
    }

    fn commit(&self) -> StoreResult<()> {
        Ok(self.control("COMMIT")?)
    }

    fn rollback(&self) -> StoreResult<()> {
        Ok(self.control("ROLLBACK")?)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        key: row.get(0)?,
        entity_type: row.get(1)?,
        sequence: row.get(2)?,
        data: row.get(3)?,
    })
}

/// SQLite value a group key is stored and compared as.
fn sql_value(value: &FieldValue) -> Value {
    value.to_json_text().map_or(Value::Null, Value::Text)
}

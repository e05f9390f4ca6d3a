//! In-memory record store.
//!
//! Keeps rows in a `BTreeMap` keyed by record ID and snapshots the whole map
//! on `begin`, so rollback is exact. Every row write is appended to a write
//! log, which is what tests use to check how many rows an operation touched.

use crate::error::{StoreError, StoreResult};
use crate::store::{RecordStore, Scope, SequenceQuery, SortOrder};
use seqkeep_model::{RecordId, SequenceAccessor};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

struct MemoryState<E> {
    rows: BTreeMap<RecordId, E>,
    snapshot: Option<BTreeMap<RecordId, E>>,
    write_log: Vec<RecordId>,
    /// Remaining row writes before an injected failure.
    fail_after: Option<usize>,
}

impl<E> MemoryState<E> {
    fn record_write(&mut self, key: RecordId) -> StoreResult<()> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(StoreError::msg(format!("injected write failure at {key}")));
            }
            *remaining -= 1;
        }
        self.write_log.push(key);
        Ok(())
    }
}

/// A [`RecordStore`] held entirely in memory.
pub struct MemoryStore<E, A> {
    accessor: A,
    state: Mutex<MemoryState<E>>,
}

impl<E: Clone, A: SequenceAccessor<E>> MemoryStore<E, A> {
    pub fn new(accessor: A) -> Self {
        Self {
            accessor,
            state: Mutex::new(MemoryState {
                rows: BTreeMap::new(),
                snapshot: None,
                write_log: Vec::new(),
                fail_after: None,
            }),
        }
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState<E>>> {
        self.state
            .lock()
            .map_err(|_| StoreError::msg("memory store lock poisoned"))
    }

    /// Inserts rows as-is, bypassing the write log.
    pub fn seed(&self, rows: impl IntoIterator<Item = E>) -> StoreResult<()> {
        let mut state = self.state()?;
        for row in rows {
            state.rows.insert(self.accessor.key(&row), row);
        }
        Ok(())
    }

    pub fn get(&self, key: &RecordId) -> StoreResult<Option<E>> {
        Ok(self.state()?.rows.get(key).cloned())
    }

    /// All rows, ordered by key.
    pub fn rows(&self) -> StoreResult<Vec<E>> {
        Ok(self.state()?.rows.values().cloned().collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.state()?.rows.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.state()?.rows.is_empty())
    }

    /// Keys of every row written since the last [`take_write_log`](Self::take_write_log).
    pub fn take_write_log(&self) -> StoreResult<Vec<RecordId>> {
        Ok(std::mem::take(&mut self.state()?.write_log))
    }

    /// Makes the row write after the next `writes` successful ones fail.
    pub fn fail_after(&self, writes: usize) -> StoreResult<()> {
        self.state()?.fail_after = Some(writes);
        Ok(())
    }

    pub fn clear_failure(&self) -> StoreResult<()> {
        self.state()?.fail_after = None;
        Ok(())
    }

    fn in_scope(&self, scope: &Scope, row: &E) -> bool {
        scope.matches_type(self.accessor.entity_type(row))
            && scope.matches(|attribute| self.accessor.group_value(row, attribute))
    }

    fn in_query(&self, query: &SequenceQuery, row: &E) -> bool {
        if !self.in_scope(&query.scope, row) {
            return false;
        }
        match self.accessor.sequence(row) {
            Some(seq) => query.contains(seq),
            None => query.contains(i64::MIN) && query.contains(i64::MAX),
        }
    }
}

impl<E: Clone, A: SequenceAccessor<E>> RecordStore<E> for MemoryStore<E, A> {
    fn max_sequence(&self, scope: &Scope) -> StoreResult<Option<i64>> {
        let state = self.state()?;
        Ok(state
            .rows
            .values()
            .filter(|row| self.in_scope(scope, row))
            .filter_map(|row| self.accessor.sequence(row))
            .max())
    }

    fn find(&self, query: &SequenceQuery) -> StoreResult<Vec<E>> {
        let state = self.state()?;
        let mut rows: Vec<E> = state
            .rows
            .values()
            .filter(|row| self.in_query(query, row))
            .cloned()
            .collect();

        rows.sort_by_key(|row| (self.accessor.sequence(row), self.accessor.key(row)));
        if query.order == SortOrder::Descending {
            rows.reverse();
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn shift(&self, query: &SequenceQuery, delta: i64) -> StoreResult<u64> {
        let mut state = self.state()?;
        let keys: Vec<RecordId> = state
            .rows
            .iter()
            .filter(|(_, row)| self.in_query(query, row))
            .map(|(key, _)| *key)
            .collect();

        for key in &keys {
            state.record_write(*key)?;
            if let Some(row) = state.rows.get_mut(key) {
                if let Some(seq) = self.accessor.sequence(row) {
                    self.accessor.set_sequence(row, seq + delta);
                }
            }
        }
        Ok(keys.len() as u64)
    }

    fn persist(&self, entity: &E) -> StoreResult<()> {
        let mut state = self.state()?;
        let key = self.accessor.key(entity);
        state.record_write(key)?;
        state.rows.insert(key, entity.clone());
        Ok(())
    }

    fn delete(&self, entity: &E) -> StoreResult<()> {
        let mut state = self.state()?;
        let key = self.accessor.key(entity);
        state.record_write(key)?;
        state.rows.remove(&key);
        Ok(())
    }

    fn begin(&self) -> StoreResult<()> {
        let mut state = self.state()?;
        if state.snapshot.is_some() {
            return Err(StoreError::msg("transaction already open"));
        }
        state.snapshot = Some(state.rows.clone());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut state = self.state()?;
        match state.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::msg("no transaction open")),
        }
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut state = self.state()?;
        match state.snapshot.take() {
            Some(rows) => {
                state.rows = rows;
                Ok(())
            }
            None => Err(StoreError::msg("no transaction open")),
        }
    }
}

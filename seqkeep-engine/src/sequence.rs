//! Dense per-partition sequence maintenance.
//!
//! Every public operation that writes runs inside one store transaction, so
//! a failure halfway through a swap or a move leaves the partition as it was.
//! Without store-level isolation, concurrent callers on the same partition
//! can still interleave and produce duplicates or gaps; serialize writers or
//! use a store whose `begin` takes a write lock.

use crate::density::DensityReport;
use crate::error::{Direction, SequenceError, SequenceResult};
use crate::scope::scope_for;
use crate::store::{RecordStore, Scope, SequenceQuery};
use crate::txn::Transaction;
use seqkeep_model::{Registration, SequenceAccessor, SequenceConfig, FIRST_SEQUENCE};
use std::marker::PhantomData;
use tracing::debug;

/// Stateless per-call orchestrator over one entity type and one store.
pub struct SequenceEngine<'a, E, A: ?Sized, S: ?Sized> {
    config: &'a SequenceConfig,
    accessor: &'a A,
    store: &'a S,
    _entity: PhantomData<fn(&E)>,
}

impl<'a, E, S> SequenceEngine<'a, E, dyn SequenceAccessor<E>, S>
where
    S: RecordStore<E> + ?Sized,
{
    /// Engine for a registered entity type.
    pub fn for_registration(registration: &'a Registration<E>, store: &'a S) -> Self {
        Self::new(&registration.config, registration.accessor.as_ref(), store)
    }
}

impl<'a, E, A, S> SequenceEngine<'a, E, A, S>
where
    A: SequenceAccessor<E> + ?Sized,
    S: RecordStore<E> + ?Sized,
{
    pub fn new(config: &'a SequenceConfig, accessor: &'a A, store: &'a S) -> Self {
        Self {
            config,
            accessor,
            store,
            _entity: PhantomData,
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        self.config
    }

    /// The group-scoped view the entity belongs to.
    pub fn scope(&self, entity: &E) -> Scope {
        scope_for(self.config, self.accessor, entity)
    }

    /// Caller-facing position of the entity.
    pub fn position(&self, entity: &E) -> SequenceResult<i64> {
        Ok(self.config.position_for_sequence(self.current(entity)?))
    }

    // ── Assignment and compaction ────────────────────────────────

    /// Appends the entity to the end of its partition if it has no sequence
    /// yet. Only the in-memory entity changes; the caller persists it.
    ///
    /// Returns the entity's sequence value.
    pub fn assign_sequence(&self, entity: &mut E) -> SequenceResult<i64> {
        if let Some(seq) = self.accessor.sequence(entity) {
            return Ok(seq);
        }
        let next = self.next_free(entity)?;
        self.accessor.set_sequence(entity, next);
        debug!("Assigned sequence {} to {}", next, self.accessor.key(entity));
        Ok(next)
    }

    /// Closes the gap an entity leaves behind by decrementing every
    /// persisted row after it in the partition.
    ///
    /// Must run while the entity still carries the sequence it was stored
    /// with. Returns the number of rows shifted.
    pub fn update_sequences_on_delete(&self, entity: &E) -> SequenceResult<u64> {
        let current = self.current(entity)?;
        self.atomically("delete compaction", || self.compact_after(entity, current))
    }

    /// Assigns a sequence if needed and persists the entity, atomically.
    pub fn insert(&self, entity: &mut E) -> SequenceResult<i64> {
        self.atomically("insert", || {
            let seq = self.assign_sequence(entity)?;
            self.store.persist(entity)?;
            Ok(seq)
        })
    }

    /// Deletes the entity and compacts its partition, atomically.
    ///
    /// Returns the number of rows shifted.
    pub fn remove(&self, entity: &E) -> SequenceResult<u64> {
        let current = self.accessor.sequence(entity);
        self.atomically("remove", || {
            let shifted = match current {
                Some(seq) => self.compact_after(entity, seq)?,
                None => 0,
            };
            self.store.delete(entity)?;
            Ok(shifted)
        })
    }

    // ── Neighbours ───────────────────────────────────────────────

    /// The persisted row immediately before the entity in its partition.
    pub fn previous(&self, entity: &E) -> SequenceResult<Option<E>> {
        let current = self.current(entity)?;
        let query = SequenceQuery::new(self.scope(entity))
            .below(current)
            .descending();
        Ok(self.store.first(&query)?)
    }

    /// The persisted row immediately after the entity in its partition.
    pub fn next(&self, entity: &E) -> SequenceResult<Option<E>> {
        let current = self.current(entity)?;
        let query = SequenceQuery::new(self.scope(entity)).above(current);
        Ok(self.store.first(&query)?)
    }

    // ── Swaps ────────────────────────────────────────────────────

    /// Swaps the entity with its predecessor.
    ///
    /// Returns `false` without writing when it is already first, unless the
    /// entity type raises on boundaries.
    pub fn move_up(&self, entity: &mut E) -> SequenceResult<bool> {
        self.atomically("move up", || match self.previous(entity)? {
            Some(neighbour) => self.swap(entity, neighbour),
            None => self.boundary(entity, Direction::Previous),
        })
    }

    /// Swaps the entity with its successor.
    pub fn move_down(&self, entity: &mut E) -> SequenceResult<bool> {
        self.atomically("move down", || match self.next(entity)? {
            Some(neighbour) => self.swap(entity, neighbour),
            None => self.boundary(entity, Direction::Next),
        })
    }

    fn swap(&self, entity: &mut E, mut neighbour: E) -> SequenceResult<bool> {
        let ours = self.current(entity)?;
        let theirs = self.current(&neighbour)?;

        self.accessor.set_sequence(entity, theirs);
        self.accessor.set_sequence(&mut neighbour, ours);
        let written = self
            .store
            .persist(entity)
            .and_then(|()| self.store.persist(&neighbour));
        if let Err(e) = written {
            self.accessor.set_sequence(entity, ours);
            return Err(e.into());
        }

        debug!(
            "Swapped {} ({} -> {}) with {}",
            self.accessor.key(entity),
            ours,
            theirs,
            self.accessor.key(&neighbour)
        );
        Ok(true)
    }

    fn boundary(&self, entity: &E, direction: Direction) -> SequenceResult<bool> {
        let key = self.accessor.key(entity);
        if self.config.exceptions {
            return Err(SequenceError::NotFound { direction, key });
        }
        debug!("No {} neighbour for {}, leaving it in place", direction, key);
        Ok(false)
    }

    // ── Arbitrary moves ──────────────────────────────────────────

    /// Moves the entity to `position` (caller numbering), shifting every row
    /// between the old and new slot by one.
    ///
    /// Returns `false` without touching the store when the entity is
    /// already there.
    pub fn move_to(&self, entity: &mut E, position: i64) -> SequenceResult<bool> {
        let current = self.current(entity)?;
        let target = self.config.sequence_for_position(position);
        if target == current {
            return Ok(false);
        }
        self.atomically("move", || {
            let target = self.bounded_target(entity, current, target)?;
            self.relocate(entity, current, target)
        })
    }

    /// Moves the entity to the first position of its partition.
    pub fn move_to_top(&self, entity: &mut E) -> SequenceResult<bool> {
        self.move_to(entity, self.config.start())
    }

    /// Moves the entity to the last position of its partition.
    pub fn move_to_bottom(&self, entity: &mut E) -> SequenceResult<bool> {
        let current = self.current(entity)?;
        self.atomically("move to bottom", || {
            let last = self.last_sequence(entity, current)?;
            self.relocate(entity, current, last)
        })
    }

    fn relocate(&self, entity: &mut E, current: i64, target: i64) -> SequenceResult<bool> {
        if target == current {
            return Ok(false);
        }
        let scope = self.scope(entity);
        let shifted = if target > current {
            let passed = SequenceQuery::new(scope).above(current).at_most(target);
            self.store.shift(&passed, -1)?
        } else {
            let displaced = SequenceQuery::new(scope).at_least(target).below(current);
            self.store.shift(&displaced, 1)?
        };

        self.accessor.set_sequence(entity, target);
        if let Err(e) = self.store.persist(entity) {
            self.accessor.set_sequence(entity, current);
            return Err(e.into());
        }
        debug!(
            "Moved {} from {} to {}, shifted {} rows",
            self.accessor.key(entity),
            current,
            target,
            shifted
        );
        Ok(true)
    }

    /// Checks a target against the partition's bounds, clamping it unless
    /// the entity type raises on boundaries.
    fn bounded_target(&self, entity: &E, current: i64, target: i64) -> SequenceResult<i64> {
        let last = self.last_sequence(entity, current)?;
        if (FIRST_SEQUENCE..=last).contains(&target) {
            return Ok(target);
        }
        if self.config.exceptions {
            return Err(SequenceError::OutOfRange {
                position: self.config.position_for_sequence(target),
                first: self.config.start(),
                last: self.config.position_for_sequence(last),
            });
        }
        let clamped = target.clamp(FIRST_SEQUENCE, last);
        debug!("Clamped move target {} to {}", target, clamped);
        Ok(clamped)
    }

    // ── Maintenance ──────────────────────────────────────────────

    /// Reports gaps and duplicates in the entity's partition.
    pub fn audit(&self, entity: &E) -> SequenceResult<DensityReport> {
        let rows = self.store.find(&SequenceQuery::new(self.scope(entity)))?;
        Ok(DensityReport::from_sequences(
            rows.iter().map(|row| self.accessor.sequence(row)),
        ))
    }

    /// Renumbers the entity's partition densely, keeping the current order
    /// and breaking ties by key. Unassigned rows go last.
    ///
    /// Returns the number of rows rewritten.
    pub fn repair(&self, entity: &E) -> SequenceResult<u64> {
        let scope = self.scope(entity);
        self.atomically("repair", || {
            let mut rows = self.store.find(&SequenceQuery::new(scope))?;
            rows.sort_by_key(|row| {
                (
                    self.accessor.sequence(row).unwrap_or(i64::MAX),
                    self.accessor.key(row),
                )
            });

            let mut rewritten = 0;
            for (want, row) in (FIRST_SEQUENCE..).zip(rows.iter_mut()) {
                if self.accessor.sequence(row) != Some(want) {
                    self.accessor.set_sequence(row, want);
                    self.store.persist(row)?;
                    rewritten += 1;
                }
            }
            if rewritten > 0 {
                debug!("Repaired partition, rewrote {} rows", rewritten);
            }
            Ok(rewritten)
        })
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn current(&self, entity: &E) -> SequenceResult<i64> {
        self.accessor
            .sequence(entity)
            .ok_or_else(|| SequenceError::Unassigned(self.accessor.key(entity)))
    }

    fn next_free(&self, entity: &E) -> SequenceResult<i64> {
        let max = self.store.max_sequence(&self.scope(entity))?;
        Ok(max.map_or(FIRST_SEQUENCE, |m| (m + 1).max(FIRST_SEQUENCE)))
    }

    /// Largest sequence in the partition, never below the entity's own.
    fn last_sequence(&self, entity: &E, current: i64) -> SequenceResult<i64> {
        let max = self.store.max_sequence(&self.scope(entity))?;
        Ok(max.map_or(current, |m| m.max(current)))
    }

    fn compact_after(&self, entity: &E, current: i64) -> SequenceResult<u64> {
        let trailing = SequenceQuery::new(self.scope(entity)).above(current);
        let shifted = self.store.shift(&trailing, -1)?;
        debug!(
            "Compacted {} rows after {} at {}",
            shifted,
            self.accessor.key(entity),
            current
        );
        Ok(shifted)
    }

    fn atomically<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> SequenceResult<T>,
    ) -> SequenceResult<T> {
        let txn = Transaction::<'_, E, S>::begin(self.store, operation)?;
        let out = f()?;
        txn.commit()?;
        Ok(out)
    }
}

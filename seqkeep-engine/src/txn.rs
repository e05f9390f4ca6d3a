//! Scoped store transactions.

use crate::error::StoreResult;
use crate::store::RecordStore;
use std::marker::PhantomData;
use tracing::warn;

/// Rolls the store back on drop unless [`commit`](Transaction::commit) ran.
pub(crate) struct Transaction<'s, E, S: RecordStore<E> + ?Sized> {
    store: &'s S,
    operation: &'static str,
    finished: bool,
    _entity: PhantomData<fn(&E)>,
}

impl<'s, E, S: RecordStore<E> + ?Sized> Transaction<'s, E, S> {
    pub(crate) fn begin(store: &'s S, operation: &'static str) -> StoreResult<Self> {
        store.begin()?;
        Ok(Self {
            store,
            operation,
            finished: false,
            _entity: PhantomData,
        })
    }

    pub(crate) fn commit(mut self) -> StoreResult<()> {
        self.store.commit()?;
        self.finished = true;
        Ok(())
    }
}

impl<E, S: RecordStore<E> + ?Sized> Drop for Transaction<'_, E, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Rolling back {} after failure", self.operation);
        if let Err(e) = self.store.rollback() {
            warn!("Rollback of {} failed: {}", self.operation, e);
        }
    }
}

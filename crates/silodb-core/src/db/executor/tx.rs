use crate::{
    db::engine::{CursorHandle, ExecMode, ExecOutput, QueryHandle, StorageEngine},
    error::InternalError,
    traits::{EntityId, EntityKind},
};

///
/// Tx
///
/// Scoped storage transaction. The cursor is released on drop unless the
/// transaction was committed, so an early return or panic aborts writes.
///

pub(crate) struct Tx<'a, E: EntityKind> {
    engine: &'a dyn StorageEngine<E>,
    cursor: CursorHandle,
    open: bool,
}

impl<'a, E: EntityKind> Tx<'a, E> {
    pub(crate) fn begin_read(engine: &'a dyn StorageEngine<E>) -> Result<Self, InternalError> {
        let cursor = engine.begin_read()?;

        Ok(Self {
            engine,
            cursor,
            open: true,
        })
    }

    pub(crate) fn begin_write(engine: &'a dyn StorageEngine<E>) -> Result<Self, InternalError> {
        let cursor = engine.begin_write()?;

        Ok(Self {
            engine,
            cursor,
            open: true,
        })
    }

    pub(crate) fn execute(
        &self,
        handle: QueryHandle,
        mode: ExecMode,
    ) -> Result<ExecOutput<E>, InternalError> {
        self.engine.execute(handle, self.cursor, mode)
    }

    pub(crate) fn get(&self, id: EntityId) -> Result<Option<E>, InternalError> {
        self.engine.get(self.cursor, id)
    }

    pub(crate) fn put(&self, mut entity: E) -> Result<EntityId, InternalError> {
        entity.clear_relations();
        self.engine.put(self.cursor, entity)
    }

    pub(crate) fn commit(mut self) -> Result<(), InternalError> {
        self.open = false;
        self.engine.commit(self.cursor)
    }
}

impl<E: EntityKind> Drop for Tx<'_, E> {
    fn drop(&mut self) {
        if self.open {
            self.engine.release(self.cursor);
        }
    }
}

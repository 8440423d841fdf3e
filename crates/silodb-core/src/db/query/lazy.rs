use crate::{
    db::{
        Store,
        executor::{Executor, Tx},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    traits::{EntityId, EntityKind},
};
use parking_lot::Mutex;
use std::fmt;

///
/// LazyResultList
///
/// Identifier sequence whose entities are read from storage on access.
/// A caching list keeps every entity it has resolved; a non-caching list
/// re-reads on every access. `len` is always the identifier count.
///

pub struct LazyResultList<E: EntityKind> {
    store: Store<E>,
    ids: Vec<EntityId>,
    cache: Option<Mutex<Vec<Option<E>>>>,
}

impl<E: EntityKind> LazyResultList<E> {
    pub(crate) fn new(store: Store<E>, ids: Vec<EntityId>, cached: bool) -> Self {
        let cache = cached.then(|| Mutex::new(vec![None; ids.len()]));

        Self { store, ids, cache }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    #[must_use]
    pub fn id(&self, index: usize) -> Option<EntityId> {
        self.ids.get(index).copied()
    }

    /// Entity at `index`, or `None` if it was removed after the ids were read.
    pub fn get(&self, index: usize) -> Result<Option<E>, InternalError> {
        Executor::new(&self.store).read(|tx| self.get_in(tx, index))
    }

    /// Number of entities held by the cache; always 0 when not caching.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.lock().iter().flatten().count())
    }

    #[must_use]
    pub fn is_loaded(&self, index: usize) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.lock().get(index).is_some_and(Option::is_some))
    }

    /// Resolve every entity not yet cached, in one read transaction.
    pub fn load_remaining(&self) -> Result<(), InternalError> {
        if self.cache.is_none() {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Query,
                "load_remaining requires a caching list",
            ));
        }

        Executor::new(&self.store).read(|tx| {
            for index in 0..self.ids.len() {
                self.get_in(tx, index)?;
            }

            Ok(())
        })
    }

    /// Every entity still present, in identifier order.
    pub fn to_vec(&self) -> Result<Vec<E>, InternalError> {
        Executor::new(&self.store).read(|tx| {
            let mut out = Vec::with_capacity(self.ids.len());
            for index in 0..self.ids.len() {
                if let Some(entity) = self.get_in(tx, index)? {
                    out.push(entity);
                }
            }

            Ok(out)
        })
    }

    /// Resolve `index` inside an already open transaction.
    pub(crate) fn get_in(&self, tx: &Tx<'_, E>, index: usize) -> Result<Option<E>, InternalError> {
        let Some(id) = self.id(index) else {
            return Err(InternalError::query_invariant(format!(
                "index {index} is out of range for a lazy list of {}",
                self.ids.len()
            )));
        };

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.lock().get(index).cloned().flatten()
        {
            return Ok(Some(hit));
        }

        let entity = tx.get(id)?;
        if let (Some(cache), Some(entity)) = (&self.cache, &entity)
            && let Some(slot) = cache.lock().get_mut(index)
        {
            *slot = Some(entity.clone());
        }

        Ok(entity)
    }
}

impl<E: EntityKind> fmt::Debug for LazyResultList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResultList")
            .field("entity", &E::MODEL.entity_name)
            .field("len", &self.ids.len())
            .field("cached", &self.is_cached())
            .field("loaded", &self.loaded_count())
            .finish()
    }
}

//! Relations and eager resolution.
//!
//! `ToOne` and `ToMany` are lazy fields on entities. A query with eager
//! relations forces them to load before results are returned, bounded per
//! relation by a result-index limit.

use crate::{
    db::{Store, WeakStore, query::QueryError},
    error::{ErrorClass, InternalError},
    model::Property,
    traits::{EntityId, EntityKind},
};
use std::{fmt, sync::Arc, sync::OnceLock};

///
/// RelationLoader
///
/// Loads related entities for a key: the target id of a to-one relation,
/// or the owner id of a to-many relation.
///

pub trait RelationLoader<T>: Send + Sync {
    fn load(&self, key: EntityId) -> Result<Vec<T>, InternalError>;
}

impl<T, F> RelationLoader<T> for F
where
    F: Fn(EntityId) -> Result<Vec<T>, InternalError> + Send + Sync,
{
    fn load(&self, key: EntityId) -> Result<Vec<T>, InternalError> {
        self(key)
    }
}

/// Loaders live inside stored rows, so they hold stores weakly; a strong
/// handle would let two related engines keep each other alive.
fn live_store<T: EntityKind>(store: &WeakStore<T>) -> Result<Store<T>, InternalError> {
    store.upgrade().ok_or_else(|| {
        InternalError::relation(
            ErrorClass::Unsupported,
            format!("{} store was dropped", T::MODEL.entity_name),
        )
    })
}

/// A store resolves to-one targets by id.
impl<T: EntityKind> RelationLoader<T> for WeakStore<T> {
    fn load(&self, key: EntityId) -> Result<Vec<T>, InternalError> {
        Ok(live_store(self)?.get(key)?.into_iter().collect())
    }
}

///
/// Backlink
/// Resolves a to-many relation through the target's pointer property.
///

pub struct Backlink<T: EntityKind> {
    store: WeakStore<T>,
    property: Property,
}

impl<T: EntityKind> Backlink<T> {
    #[must_use]
    pub const fn new(store: WeakStore<T>, property: Property) -> Self {
        Self { store, property }
    }
}

impl<T: EntityKind> RelationLoader<T> for Backlink<T> {
    fn load(&self, owner: EntityId) -> Result<Vec<T>, InternalError> {
        let owner = i64::try_from(owner).map_err(|_| {
            InternalError::relation(ErrorClass::InvalidArgument, "owner id out of range")
        })?;
        let store = live_store(&self.store)?;

        let run = || -> Result<Vec<T>, QueryError> {
            store
                .query()
                .equal(&self.property, owner)?
                .build()?
                .find()
        };

        run().map_err(|err| match err {
            QueryError::Execute(inner) => inner,
            other => InternalError::relation(other.class(), other.to_string()),
        })
    }
}

///
/// ResolveRelation
/// Object-safe view of a relation field used by the eager resolver.
///

pub trait ResolveRelation {
    /// Load the relation unless it is already cached.
    fn resolve(&self, owner: EntityId) -> Result<(), InternalError>;

    fn is_resolved(&self) -> bool;
}

///
/// ToOne
///

pub struct ToOne<T> {
    target_id: EntityId,
    loader: Option<Arc<dyn RelationLoader<T>>>,
    target: OnceLock<Option<T>>,
}

impl<T> ToOne<T> {
    #[must_use]
    pub const fn new(target_id: EntityId) -> Self {
        Self {
            target_id,
            loader: None,
            target: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn RelationLoader<T>>) -> Self {
        self.loader = Some(loader);
        self
    }

    #[must_use]
    pub const fn target_id(&self) -> EntityId {
        self.target_id
    }

    /// Cached target, without loading.
    #[must_use]
    pub fn cached(&self) -> Option<&T> {
        self.target.get().and_then(Option::as_ref)
    }

    /// Target entity, loading and caching it on first access.
    pub fn target(&self) -> Result<Option<&T>, InternalError> {
        if let Some(cached) = self.target.get() {
            return Ok(cached.as_ref());
        }

        let loaded = match (self.target_id, &self.loader) {
            (0, _) => None,
            (id, Some(loader)) => loader.load(id)?.into_iter().next(),
            (id, None) => {
                return Err(InternalError::relation(
                    ErrorClass::Unsupported,
                    format!("to-one target {id} is detached from any store"),
                ));
            }
        };

        // A concurrent resolver may have won; either value is equivalent.
        let _ = self.target.set(loaded);

        Ok(self.cached())
    }

    /// Forget the cached target; the next access reloads it.
    pub fn reset(&mut self) {
        self.target = OnceLock::new();
    }
}

impl<T> ResolveRelation for ToOne<T> {
    fn resolve(&self, _owner: EntityId) -> Result<(), InternalError> {
        self.target().map(|_| ())
    }

    fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }
}

impl<T> Default for ToOne<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Clone> Clone for ToOne<T> {
    fn clone(&self) -> Self {
        Self {
            target_id: self.target_id,
            loader: self.loader.clone(),
            target: self.target.clone(),
        }
    }
}

impl<T> fmt::Debug for ToOne<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToOne")
            .field("target_id", &self.target_id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

///
/// ToMany
///

pub struct ToMany<T> {
    loader: Option<Arc<dyn RelationLoader<T>>>,
    items: OnceLock<Vec<T>>,
}

impl<T> ToMany<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            loader: None,
            items: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn RelationLoader<T>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Cached items, without loading.
    #[must_use]
    pub fn cached(&self) -> Option<&[T]> {
        self.items.get().map(Vec::as_slice)
    }

    /// Items for `owner`, loading and caching them on first access.
    pub fn load(&self, owner: EntityId) -> Result<&[T], InternalError> {
        if let Some(items) = self.items.get() {
            return Ok(items);
        }

        let loaded = match (owner, &self.loader) {
            (0, _) => Vec::new(),
            (owner, Some(loader)) => loader.load(owner)?,
            (_, None) => {
                return Err(InternalError::relation(
                    ErrorClass::Unsupported,
                    "to-many relation is detached from any store",
                ));
            }
        };
        let _ = self.items.set(loaded);

        Ok(self.cached().unwrap_or_default())
    }

    /// Forget the cached items; the next access reloads them.
    pub fn reset(&mut self) {
        self.items = OnceLock::new();
    }
}

impl<T> ResolveRelation for ToMany<T> {
    fn resolve(&self, owner: EntityId) -> Result<(), InternalError> {
        self.load(owner).map(|_| ())
    }

    fn is_resolved(&self) -> bool {
        self.items.get().is_some()
    }
}

impl<T> Default for ToMany<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for ToMany<T> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            items: self.items.clone(),
        }
    }
}

impl<T> fmt::Debug for ToMany<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToMany")
            .field("resolved", &self.is_resolved())
            .field("len", &self.cached().map(<[T]>::len))
            .finish()
    }
}

///
/// RelationInfo
///
/// Closed set of relation kinds an entity can declare; each variant knows
/// how to reach its field on the owning entity.
///

pub enum RelationInfo<E> {
    ToOne {
        name: &'static str,
        get: fn(&E) -> Option<&dyn ResolveRelation>,
    },
    ToMany {
        name: &'static str,
        get: fn(&E) -> Option<&dyn ResolveRelation>,
    },
}

impl<E> Clone for RelationInfo<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RelationInfo<E> {}

impl<E> fmt::Debug for RelationInfo<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToOne { name, .. } => write!(f, "ToOne({name})"),
            Self::ToMany { name, .. } => write!(f, "ToMany({name})"),
        }
    }
}

impl<E: EntityKind> RelationInfo<E> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ToOne { name, .. } | Self::ToMany { name, .. } => name,
        }
    }

    /// Force the relation on `entity` to load.
    pub fn resolve(&self, entity: &E) -> Result<(), InternalError> {
        let field = match self {
            Self::ToOne { get, .. } | Self::ToMany { get, .. } => get(entity),
        };

        match field {
            Some(field) if !field.is_resolved() => field.resolve(entity.id()),
            _ => Ok(()),
        }
    }
}

///
/// EagerRelation
/// A relation to resolve for results at index < `limit` (0 = all).
///

pub struct EagerRelation<E> {
    pub relation: RelationInfo<E>,
    pub limit: usize,
}

impl<E> fmt::Debug for EagerRelation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerRelation")
            .field("relation", &self.relation)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<E> Clone for EagerRelation<E> {
    fn clone(&self) -> Self {
        Self {
            relation: self.relation,
            limit: self.limit,
        }
    }
}

impl<E: EntityKind> EagerRelation<E> {
    #[must_use]
    pub const fn applies_to(&self, index: usize) -> bool {
        self.limit == 0 || index < self.limit
    }
}

/// Resolve every eager relation that applies to the result at `index`.
pub(crate) fn resolve_at<E: EntityKind>(
    relations: &[EagerRelation<E>],
    entity: &E,
    index: usize,
) -> Result<(), InternalError> {
    for eager in relations.iter().filter(|eager| eager.applies_to(index)) {
        tracing::trace!(relation = eager.relation.name(), index, "resolving eager relation");
        eager.relation.resolve(entity)?;
    }

    Ok(())
}

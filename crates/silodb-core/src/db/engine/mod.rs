//! Storage engine boundary.
//!
//! The query layer talks to storage only through opaque handles: a compiled
//! query handle per `Query`, and a cursor handle per open transaction.
//! `MemoryEngine` is the in-process reference implementation.

mod memory;


pub use memory::MemoryEngine;

use crate::{
    db::query::{
        order::OrderSpec,
        param::ParameterSlot,
        predicate::{Operand, Predicate},
    },
    error::InternalError,
    model::PropertyId,
    traits::{EntityId, EntityKind},
};
use derive_more::Display;

///
/// QueryHandle
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("query#{_0}")]
pub struct QueryHandle(pub u64);

///
/// CursorHandle
/// Scoped to one transaction; invalid after commit or release.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("cursor#{_0}")]
pub struct CursorHandle(pub u64);

///
/// ExecMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecMode {
    First,
    Unique,
    /// `limit == 0` is unbounded.
    Find { offset: u64, limit: u64 },
    IdsUnordered,
    Count,
    Sum(PropertyId),
    SumDouble(PropertyId),
    Min(PropertyId),
    MinDouble(PropertyId),
    Max(PropertyId),
    MaxDouble(PropertyId),
    Avg(PropertyId),
    Remove,
}

impl ExecMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Unique => "unique",
            Self::Find { .. } => "find",
            Self::IdsUnordered => "ids",
            Self::Count => "count",
            Self::Sum(_) => "sum",
            Self::SumDouble(_) => "sum_double",
            Self::Min(_) => "min",
            Self::MinDouble(_) => "min_double",
            Self::Max(_) => "max",
            Self::MaxDouble(_) => "max_double",
            Self::Avg(_) => "avg",
            Self::Remove => "remove",
        }
    }
}

///
/// ExecOutput
///

#[derive(Clone, Debug, PartialEq)]
pub enum ExecOutput<E> {
    Entity(Option<E>),
    Entities(Vec<E>),
    Ids(Vec<EntityId>),
    Count(u64),
    Long(i64),
    Double(f64),
    Removed(u64),
}

impl<E> ExecOutput<E> {
    /// Row count for metrics.
    #[must_use]
    pub fn rows(&self) -> u64 {
        match self {
            Self::Entity(e) => u64::from(e.is_some()),
            Self::Entities(list) => list.len() as u64,
            Self::Ids(ids) => ids.len() as u64,
            Self::Count(n) | Self::Removed(n) => *n,
            Self::Long(_) | Self::Double(_) => 1,
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Entities(_) => "entities",
            Self::Ids(_) => "ids",
            Self::Count(_) => "count",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Removed(_) => "removed",
        }
    }

    fn mismatch(&self, expected: &str) -> InternalError {
        InternalError::executor_invariant(format!(
            "engine returned {} output where {expected} was expected",
            self.label()
        ))
    }

    // ---- typed accessors ------------------------------------------------

    pub(crate) fn into_entity(self) -> Result<Option<E>, InternalError> {
        match self {
            Self::Entity(entity) => Ok(entity),
            other => Err(other.mismatch("entity")),
        }
    }

    pub(crate) fn into_entities(self) -> Result<Vec<E>, InternalError> {
        match self {
            Self::Entities(list) => Ok(list),
            other => Err(other.mismatch("entities")),
        }
    }

    pub(crate) fn into_ids(self) -> Result<Vec<EntityId>, InternalError> {
        match self {
            Self::Ids(ids) => Ok(ids),
            other => Err(other.mismatch("ids")),
        }
    }

    pub(crate) fn into_count(self) -> Result<u64, InternalError> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(other.mismatch("count")),
        }
    }

    pub(crate) fn into_long(self) -> Result<i64, InternalError> {
        match self {
            Self::Long(v) => Ok(v),
            other => Err(other.mismatch("long")),
        }
    }

    pub(crate) fn into_double(self) -> Result<f64, InternalError> {
        match self {
            Self::Double(v) => Ok(v),
            other => Err(other.mismatch("double")),
        }
    }

    pub(crate) fn into_removed(self) -> Result<u64, InternalError> {
        match self {
            Self::Removed(n) => Ok(n),
            other => Err(other.mismatch("removed")),
        }
    }
}

///
/// StorageEngine
///
/// Handle-based contract consumed by the query layer. Implementations must
/// be safe to share across threads; each read cursor sees one consistent
/// snapshot.
///

pub trait StorageEngine<E: EntityKind>: Send + Sync {
    /// Compile a condition tree and ordering into a reusable handle.
    fn compile(&self, predicate: &Predicate, order: &[OrderSpec])
    -> Result<QueryHandle, InternalError>;

    /// Release a compiled handle; releasing twice is a no-op.
    fn destroy(&self, handle: QueryHandle);

    /// Replace the operand of every leaf addressed by `slot`.
    fn bind(
        &self,
        handle: QueryHandle,
        slot: &ParameterSlot,
        operand: Operand,
    ) -> Result<(), InternalError>;

    fn execute(
        &self,
        handle: QueryHandle,
        cursor: CursorHandle,
        mode: ExecMode,
    ) -> Result<ExecOutput<E>, InternalError>;

    fn begin_read(&self) -> Result<CursorHandle, InternalError>;

    fn begin_write(&self) -> Result<CursorHandle, InternalError>;

    /// Make a write cursor's changes visible; read cursors just close.
    fn commit(&self, cursor: CursorHandle) -> Result<(), InternalError>;

    /// Close a cursor, discarding uncommitted writes.
    fn release(&self, cursor: CursorHandle);

    fn get(&self, cursor: CursorHandle, id: EntityId) -> Result<Option<E>, InternalError>;

    /// Insert or overwrite; an entity with id 0 receives the next id.
    fn put(&self, cursor: CursorHandle, entity: E) -> Result<EntityId, InternalError>;
}

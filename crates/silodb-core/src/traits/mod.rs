use crate::{
    model::{EntityModel, PropertyId},
    value::Value,
};

///
/// EntityId
///
/// Storage identifier. `0` marks an entity that has not been stored yet;
/// engines assign ids sequentially from 1.
///

pub type EntityId = u64;

///
/// EntityKind
///
/// Implemented by every persisted entity type. Query evaluation only ever
/// reads entities through `get_value`.
///

pub trait EntityKind: Clone + Send + Sync + 'static {
    const MODEL: &'static EntityModel;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Current value of a property; absent optionals read as `Value::Null`.
    fn get_value(&self, property: PropertyId) -> Value;

    /// Drop cached relation targets. Called on every write so stored rows
    /// never carry a resolved snapshot; entities with `ToOne`/`ToMany`
    /// fields reset each of them here.
    fn clear_relations(&mut self) {}
}

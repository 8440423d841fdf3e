//! Shared fixtures for unit tests.

mod entity;
mod relations;

pub(crate) use entity::{TestEntity, memory_store, put_scalars, put_strings, test_entity};
pub(crate) use relations::{Customer, Order, RelationFixture};

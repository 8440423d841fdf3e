mod params;
mod relations;
mod strings;

use crate::{
    config::StoreConfig,
    db::{Store, engine::MemoryEngine},
    test_support::{TestEntity, memory_store, put_scalars, put_strings},
    traits::EntityId,
};
use std::sync::Arc;

fn scalar_store() -> Store<TestEntity> {
    let (store, _) = memory_store(StoreConfig::default());
    put_scalars(&store);

    store
}

fn string_store() -> (Store<TestEntity>, Arc<MemoryEngine<TestEntity>>) {
    let (store, engine) = memory_store(StoreConfig::default());
    put_strings(&store);

    (store, engine)
}

fn ints(rows: &[TestEntity]) -> Vec<i32> {
    rows.iter().map(|e| e.simple_int).collect()
}

fn ids(rows: &[TestEntity]) -> Vec<EntityId> {
    rows.iter().map(|e| e.id).collect()
}

fn texts(rows: &[TestEntity]) -> Vec<&str> {
    rows.iter().map(TestEntity::text).collect()
}

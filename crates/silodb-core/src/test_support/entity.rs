use crate::{
    config::StoreConfig,
    db::{Store, engine::MemoryEngine},
    model::{EntityModel, Property, PropertyId, PropertyKind},
    traits::{EntityId, EntityKind},
    value::Value,
};
use std::{sync::Arc, time::SystemTime};

///
/// TestEntity
///
/// Scalar fixture entity. `test_entity(_, nr)` derives every column from
/// `nr`: int = nr, short = 100 + nr, long = 1000 + nr, float = 200 + nr/10,
/// boolean = nr is even.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TestEntity {
    pub id: EntityId,
    pub simple_string: Option<String>,
    pub simple_int: i32,
    pub simple_short: i16,
    pub simple_long: i64,
    pub simple_float: f32,
    pub simple_boolean: bool,
    pub simple_date: Option<SystemTime>,
}

impl TestEntity {
    pub const SIMPLE_STRING: Property = Property::new(1, "simple_string", PropertyKind::Text);
    pub const SIMPLE_INT: Property = Property::new(2, "simple_int", PropertyKind::Int);
    pub const SIMPLE_SHORT: Property = Property::new(3, "simple_short", PropertyKind::Int);
    pub const SIMPLE_LONG: Property = Property::new(4, "simple_long", PropertyKind::Int);
    pub const SIMPLE_FLOAT: Property = Property::new(5, "simple_float", PropertyKind::Float);
    pub const SIMPLE_BOOLEAN: Property = Property::new(6, "simple_boolean", PropertyKind::Bool);
    pub const SIMPLE_DATE: Property = Property::new(7, "simple_date", PropertyKind::Date);

    pub fn text(&self) -> &str {
        self.simple_string.as_deref().unwrap_or_default()
    }
}

const TEST_ENTITY_MODEL: EntityModel = EntityModel::new(
    "TestEntity",
    &[
        TestEntity::SIMPLE_STRING,
        TestEntity::SIMPLE_INT,
        TestEntity::SIMPLE_SHORT,
        TestEntity::SIMPLE_LONG,
        TestEntity::SIMPLE_FLOAT,
        TestEntity::SIMPLE_BOOLEAN,
        TestEntity::SIMPLE_DATE,
    ],
);

impl EntityKind for TestEntity {
    const MODEL: &'static EntityModel = &TEST_ENTITY_MODEL;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn get_value(&self, property: PropertyId) -> Value {
        match property.0 {
            1 => self.simple_string.clone().into(),
            2 => self.simple_int.into(),
            3 => self.simple_short.into(),
            4 => self.simple_long.into(),
            5 => self.simple_float.into(),
            6 => self.simple_boolean.into(),
            7 => self.simple_date.into(),
            _ => Value::Null,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn test_entity(text: Option<&str>, nr: i32) -> TestEntity {
    TestEntity {
        id: 0,
        simple_string: text.map(str::to_string),
        simple_int: nr,
        simple_short: (100 + nr) as i16,
        simple_long: 1000 + i64::from(nr),
        simple_float: 200.0 + nr as f32 / 10.0,
        simple_boolean: nr % 2 == 0,
        simple_date: None,
    }
}

/// Fresh store over its own memory engine.
pub(crate) fn memory_store(
    config: StoreConfig,
) -> (Store<TestEntity>, Arc<MemoryEngine<TestEntity>>) {
    let engine = Arc::new(MemoryEngine::<TestEntity>::new());
    let store = Store::<TestEntity>::builder(engine.clone())
        .config(config)
        .build()
        .expect("test store should open");

    (store, engine)
}

/// Ten scalar entities, nr 2000..=2009, stored with ids 1..=10.
pub(crate) fn put_scalars(store: &Store<TestEntity>) -> Vec<TestEntity> {
    let entities: Vec<_> = (2000..2010).map(|nr| test_entity(None, nr)).collect();
    store
        .put_many(entities.clone())
        .expect("scalar fixtures should store");

    entities
}

/// Five string entities, stored with ids in insertion order.
pub(crate) fn put_strings(store: &Store<TestEntity>) -> Vec<TestEntity> {
    let entities: Vec<_> = ["banana", "apple", "bar", "banana milk shake", "foo bar"]
        .into_iter()
        .zip(1..)
        .map(|(text, nr)| test_entity(Some(text), nr))
        .collect();
    store
        .put_many(entities.clone())
        .expect("string fixtures should store");

    entities
}

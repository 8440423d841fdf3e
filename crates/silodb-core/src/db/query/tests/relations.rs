use crate::{
    db::{
        engine::MemoryEngine,
        relation::{ResolveRelation, ToMany, ToOne},
    },
    error::{ErrorClass, ErrorOrigin},
    test_support::{Customer, Order, RelationFixture},
};
use std::{ops::ControlFlow, sync::Arc};

#[test]
fn eager_to_many_loads_every_result() {
    let fixture = RelationFixture::new();
    let customers = fixture
        .customers
        .query()
        .eager(Customer::ORDERS, 0)
        .build()
        .unwrap()
        .find()
        .unwrap();

    let counts: Vec<_> = customers
        .iter()
        .map(|c| c.orders.cached().map(<[Order]>::len))
        .collect();
    assert_eq!(counts, vec![Some(3), Some(1)]);

    let texts: Vec<_> = customers[0]
        .orders
        .cached()
        .unwrap_or_default()
        .iter()
        .map(|o| o.text.as_str())
        .collect();
    assert_eq!(texts, vec!["tea", "scones", "jam"]);
}

#[test]
fn eager_limit_bounds_resolution_by_index() {
    let fixture = RelationFixture::new();
    let orders = fixture
        .orders
        .query()
        .eager(Order::CUSTOMER, 1)
        .build()
        .unwrap()
        .find()
        .unwrap();

    assert_eq!(orders.len(), 4);
    assert_eq!(orders[0].customer.cached().map(|c| c.name.as_str()), Some("ada"));
    assert!(orders[1..].iter().all(|o| !o.customer.is_resolved()));
}

#[test]
fn eager_relations_apply_to_single_reads_and_for_each() {
    let fixture = RelationFixture::new();
    let query = fixture
        .orders
        .query()
        .equal(&Order::CUSTOMER_ID, 2)
        .unwrap()
        .eager(Order::CUSTOMER, 0)
        .build()
        .unwrap();

    let first = query.find_first().unwrap().unwrap();
    assert_eq!(first.customer.cached().map(|c| c.name.as_str()), Some("bob"));

    let mut resolved = Vec::new();
    query
        .for_each(|order| {
            resolved.push(order.customer.is_resolved());
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(resolved, vec![true]);
}

#[test]
fn lazy_relations_load_on_first_access() {
    let fixture = RelationFixture::new();
    let order = fixture.orders.get(4).unwrap().unwrap();

    assert!(order.customer.cached().is_none());
    let customer = order.customer.target().unwrap().unwrap();
    assert_eq!(customer.name, "bob");
    assert!(order.customer.is_resolved());

    let ada = fixture.customers.get(1).unwrap().unwrap();
    assert_eq!(ada.orders.load(ada.id).unwrap().len(), 3);
}

#[test]
fn unset_and_detached_relations() {
    let unset: ToOne<Customer> = ToOne::new(0);
    assert!(unset.target().unwrap().is_none());

    let detached: ToOne<Customer> = ToOne::new(7);
    let err = detached.target().unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::Relation);

    let unsaved: ToMany<Order> = ToMany::new();
    assert!(unsaved.load(0).unwrap().is_empty());
    assert!(unsaved.is_resolved());
}

#[test]
fn written_back_entities_reload_eager_relations() {
    let fixture = RelationFixture::new();
    let query = fixture
        .customers
        .query()
        .eager(Customer::ORDERS, 0)
        .build()
        .unwrap();

    let mut ada = query.find().unwrap().remove(0);
    assert_eq!(ada.orders.cached().map(<[Order]>::len), Some(3));

    ada.name = "ada lovelace".to_string();
    let ada_id = fixture.customers.put(ada).unwrap();
    assert!(!fixture.customers.get(ada_id).unwrap().unwrap().orders.is_resolved());

    fixture.put_order("cake", ada_id);
    let customers = query.find().unwrap();
    assert_eq!(customers[0].name, "ada lovelace");
    assert_eq!(customers[0].orders.cached().map(<[Order]>::len), Some(4));
}

#[test]
fn related_engines_are_freed_with_their_stores() {
    let customers = Arc::new(MemoryEngine::<Customer>::new());
    let orders = Arc::new(MemoryEngine::<Order>::new());
    let customers_alive = Arc::downgrade(&customers);
    let orders_alive = Arc::downgrade(&orders);

    let fixture = RelationFixture::over(customers, orders);
    let ada = fixture.customers.get(1).unwrap().unwrap();
    assert_eq!(ada.orders.load(ada.id).unwrap().len(), 3);
    let order = fixture.orders.get(4).unwrap().unwrap();
    drop(fixture);

    assert!(customers_alive.upgrade().is_none());
    assert!(orders_alive.upgrade().is_none());

    let err = order.customer.target().unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::Relation);
}

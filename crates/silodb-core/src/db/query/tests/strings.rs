use super::*;
use crate::{
    db::{
        ExceptionListener,
        query::{
            OrderFlags, StringOrder,
            predicate::{CompareOp, Operand},
        },
    },
    error::{ErrorClass, InternalError},
    test_support::test_entity,
};
use parking_lot::Mutex;
use std::ops::ControlFlow;

#[test]
fn string_equality_is_unique() {
    let (store, _) = string_store();
    let query = store
        .query()
        .equal(&TestEntity::SIMPLE_STRING, "banana")
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(1));
}

#[test]
fn prefix_and_suffix_combine() {
    let (store, _) = string_store();
    let query = store
        .query()
        .starts_with(&TestEntity::SIMPLE_STRING, "ba")
        .unwrap()
        .ends_with(&TestEntity::SIMPLE_STRING, "shake")
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(4));
}

#[test]
fn contains_matches_substrings() {
    let (store, _) = string_store();
    let query = store
        .query()
        .contains(&TestEntity::SIMPLE_STRING, "nana")
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(query.count().unwrap(), 2);
}

#[test]
fn case_sensitivity_is_per_condition() {
    let (store, _) = string_store();
    store.put(test_entity(Some("BAR"), 100)).unwrap();

    let folded = store
        .query()
        .equal(&TestEntity::SIMPLE_STRING, "bar")
        .unwrap()
        .build()
        .unwrap();
    let strict = store
        .query()
        .compare(
            &TestEntity::SIMPLE_STRING,
            CompareOp::Eq,
            Operand::Single("bar".into()),
            StringOrder::CaseSensitive,
        )
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(folded.count().unwrap(), 2);
    assert_eq!(strict.count().unwrap(), 1);
}

#[test]
fn default_order_folds_case_and_breaks_ties_by_bytes() {
    let (store, _) = string_store();
    store.put(test_entity(Some("BAR"), 100)).unwrap();

    let query = store
        .query()
        .order(&TestEntity::SIMPLE_STRING, OrderFlags::NONE)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        texts(&query.find().unwrap()),
        vec!["apple", "banana", "banana milk shake", "BAR", "bar", "foo bar"]
    );
}

#[test]
fn combined_order_flags() {
    let (store, _) = string_store();
    store.put(test_entity(Some("BAR"), 100)).unwrap();
    let null_id = store.put(test_entity(None, 101)).unwrap();

    let flags = OrderFlags::CASE_SENSITIVE | OrderFlags::NULLS_LAST | OrderFlags::DESCENDING;
    let rows = store
        .query()
        .order(&TestEntity::SIMPLE_STRING, flags)
        .unwrap()
        .build()
        .unwrap()
        .find()
        .unwrap();

    assert_eq!(
        texts(&rows[..6]),
        vec!["foo bar", "bar", "banana milk shake", "banana", "apple", "BAR"]
    );
    assert_eq!(rows[6].id, null_id);
}

#[test]
fn for_each_streams_in_id_order_and_stops_on_break() {
    let (store, _) = string_store();
    let query = store
        .query()
        .starts_with(&TestEntity::SIMPLE_STRING, "banana")
        .unwrap()
        .build()
        .unwrap();

    let mut seen = String::new();
    query
        .for_each(|e| {
            seen.push_str(e.text());
            seen.push('#');
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(seen, "banana#banana milk shake#");

    let mut first = String::new();
    query
        .for_each(|e| {
            first.push_str(e.text());
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(first, "banana");
}

#[test]
fn filter_runs_after_conditions() {
    let (store, _) = string_store();
    let query = store
        .query()
        .filter(|e: &TestEntity| e.text().contains('e'))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(texts(&query.find().unwrap()), vec!["apple", "banana milk shake"]);

    let mut streamed = Vec::new();
    query
        .for_each(|e| {
            streamed.push(e.id);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(streamed, vec![2, 4]);
}

#[test]
fn comparator_sorts_the_final_result() {
    let (store, _) = string_store();
    let query = store
        .query()
        .sort(|a: &TestEntity, b: &TestEntity| a.text()[1..].cmp(&b.text()[1..]))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        texts(&query.find().unwrap()),
        vec!["banana", "banana milk shake", "bar", "foo bar", "apple"]
    );
}

#[test]
fn non_unique_result_reaches_the_exception_listener() {
    let (store, _) = string_store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn ExceptionListener> = Arc::new(move |err: &InternalError| {
        sink.lock().push(err.class);
    });
    store.set_exception_listener(Some(listener));

    let query = store
        .query()
        .not_null(&TestEntity::SIMPLE_STRING)
        .unwrap()
        .build()
        .unwrap();
    let err = query.find_unique().unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotUnique);
    assert_eq!(*seen.lock(), vec![ErrorClass::NotUnique]);
}

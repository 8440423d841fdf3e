use super::*;
use crate::{
    config::StoreConfig,
    db::query::{Query, QueryError},
    error::ErrorClass,
    test_support::{TestEntity, memory_store, put_scalars, test_entity},
};
use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
    time::Duration,
};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(150);

fn scalar_query() -> Query<TestEntity> {
    let (store, _) = memory_store(StoreConfig::default().worker_threads(1));
    put_scalars(&store);

    store
        .query()
        .equal(&TestEntity::SIMPLE_INT, 2007)
        .unwrap()
        .build()
        .unwrap()
}

fn watch(query: &Query<TestEntity>) -> (DataSubscription, Receiver<Vec<i32>>) {
    let (tx, rx) = mpsc::channel();
    let subscription = query.subscribe().observer(move |rows: Vec<TestEntity>| {
        let _ = tx.send(rows.iter().map(|e| e.simple_int).collect());
    });

    (subscription, rx)
}

#[test]
fn subscribing_replays_the_current_result() {
    let query = scalar_query();
    let (_subscription, rx) = watch(&query);

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![2007]);
}

#[test]
fn publish_delivers_rebound_results() {
    let query = scalar_query();
    let (_subscription, rx) = watch(&query);
    rx.recv_timeout(WAIT).unwrap();

    query.set_parameter(&TestEntity::SIMPLE_INT, 2003).unwrap();
    assert!(rx.recv_timeout(QUIET).is_err(), "rebinding must not publish");

    assert_eq!(query.publish(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![2003]);
}

#[test]
fn canceled_subscription_receives_nothing() {
    let query = scalar_query();
    let (subscription, rx) = watch(&query);
    rx.recv_timeout(WAIT).unwrap();

    subscription.cancel();
    subscription.cancel();
    assert!(subscription.is_canceled());

    assert_eq!(query.publish(), 0);
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn subscription_list_cancels_every_member() {
    let query = scalar_query();
    let list = DataSubscriptionList::new();
    let (tx, rx) = mpsc::channel();

    for _ in 0..2 {
        let tx = tx.clone();
        query.subscribe_with(&list).observer(move |rows: Vec<TestEntity>| {
            let _ = tx.send(rows.len());
        });
    }
    assert_eq!(list.len(), 2);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);

    list.cancel();
    assert!(list.is_empty());
    assert_eq!(query.publish(), 0);
}

#[test]
fn publish_reaches_every_live_observer() {
    let query = scalar_query();
    let (first, first_rx) = watch(&query);
    let (_second, second_rx) = watch(&query);
    first_rx.recv_timeout(WAIT).unwrap();
    second_rx.recv_timeout(WAIT).unwrap();

    first.cancel();
    assert_eq!(query.publish(), 1);

    assert_eq!(second_rx.recv_timeout(WAIT).unwrap(), vec![2007]);
    assert!(first_rx.recv_timeout(QUIET).is_err());
}

#[test]
fn failures_go_to_the_error_observer() {
    let query = scalar_query();
    let (err_tx, err_rx) = mpsc::channel();
    let (data_tx, data_rx) = mpsc::channel();

    let _subscription = query
        .subscribe()
        .on_error(move |err: QueryError| {
            let _ = err_tx.send(err.class());
        })
        .observer(move |rows: Vec<TestEntity>| {
            let _ = data_tx.send(rows.len());
        });
    data_rx.recv_timeout(WAIT).unwrap();

    query.close();
    assert_eq!(query.publish(), 1);

    assert_eq!(err_rx.recv_timeout(WAIT).unwrap(), ErrorClass::UseAfterClose);
    assert!(data_rx.recv_timeout(QUIET).is_err());
}

#[test]
fn publisher_prunes_canceled_entries() {
    let publisher = Publisher::<TestEntity>::default();
    let live = DataSubscription::default();
    let dead = DataSubscription::default();

    for subscription in [&live, &dead] {
        publisher.add(ObserverEntry::new(
            Arc::new(|_: Vec<TestEntity>| {}),
            None,
            subscription.flag(),
        ));
    }
    dead.cancel();

    assert_eq!(publisher.active().len(), 1);
    live.cancel();
    assert!(publisher.active().is_empty());
}

#[test]
fn superseded_results_are_dropped_per_observer() {
    let (store, _) = memory_store(StoreConfig::default().worker_threads(1));
    let publisher = Publisher::<TestEntity>::default();
    let (tx, rx) = mpsc::channel();
    let entry = ObserverEntry::new(
        Arc::new(move |rows: Vec<TestEntity>| {
            let _ = tx.send(rows.iter().map(|e| e.simple_int).collect::<Vec<_>>());
        }),
        None,
        DataSubscription::default().flag(),
    );

    let replay = publisher.next_sequence();
    let published = publisher.next_sequence();
    assert!(published > replay);

    // the newer result lands first; the older replay must not overwrite it
    deliver(&store, entry.clone(), published, Ok(vec![test_entity(None, 2003)]));
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), vec![2003]);

    deliver(&store, entry, replay, Ok(vec![test_entity(None, 2007)]));
    assert!(rx.recv_timeout(QUIET).is_err());
}

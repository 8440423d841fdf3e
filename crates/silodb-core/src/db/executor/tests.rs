use super::*;
use crate::{
    config::StoreConfig,
    db::{ExceptionListener, TxFailureObserver},
    error::ErrorClass,
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    test_support::{TestEntity, memory_store, test_entity},
};
use parking_lot::Mutex;
use std::{cell::RefCell, sync::Arc, time::Duration};

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

fn retrying(attempts: u32) -> StoreConfig {
    StoreConfig::default()
        .query_attempts(attempts)
        .initial_backoff(Duration::from_millis(1))
}

#[test]
fn read_with_retry_recovers_from_transient_conflicts() {
    let (store, engine) = memory_store(retrying(3));
    let id = store.put(test_entity(Some("x"), 1)).unwrap();
    engine.inject_read_conflicts(2);

    let sink = RecordingSink::default();
    let found = with_metrics_sink(&sink, || {
        Executor::new(&store).read_with_retry(store.retry_policy(), |tx| tx.get(id))
    })
    .unwrap();

    assert_eq!(found.map(|e| e.simple_int), Some(1));
    assert_eq!(
        *sink.events.borrow(),
        vec![
            MetricsEvent::TxRetry { attempt: 1 },
            MetricsEvent::TxRetry { attempt: 2 },
        ]
    );
}

#[test]
fn exhausted_retries_report_attempts() {
    let (store, engine) = memory_store(retrying(2));
    let failures = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&failures);
    let observer: Arc<dyn TxFailureObserver> = Arc::new(move |err: &InternalError| {
        seen.lock().push(err.clone());
    });
    store.set_tx_failure_observer(Some(observer));
    engine.inject_read_conflicts(5);

    let err = Executor::new(&store)
        .read_with_retry(store.retry_policy(), |tx| tx.get(1))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::TransientConflict);
    assert_eq!(err.origin, ErrorOrigin::Executor);
    assert_eq!(err.detail, Some(ErrorDetail::Retry { attempts: 2 }));
    assert_eq!(failures.lock().len(), 1);
}

#[test]
fn non_transient_failures_are_not_retried() {
    let (store, engine) = memory_store(retrying(5));
    engine.inject_read_fault(InternalError::engine_storage("disk gone"));
    engine.inject_read_conflicts(1);

    let err = Executor::new(&store)
        .read_with_retry(store.retry_policy(), |tx| tx.get(1))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Storage);
    // the queued conflict is still pending
    assert!(store.get(1).unwrap_err().is_transient());
}

#[test]
fn plain_read_does_not_retry() {
    let (store, engine) = memory_store(retrying(3));
    engine.inject_read_conflicts(1);

    let err = Executor::new(&store).read(|tx| tx.get(1)).unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.detail, None);
}

#[test]
fn storage_failures_reach_the_exception_listener() {
    let (store, engine) = memory_store(StoreConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn ExceptionListener> = Arc::new(move |err: &InternalError| {
        sink.lock().push(err.class);
    });
    store.set_exception_listener(Some(listener));
    engine.inject_read_fault(InternalError::engine_storage("disk gone"));

    let _ = store.get(1);

    assert_eq!(*seen.lock(), vec![ErrorClass::Storage]);
}

#[test]
fn failed_write_is_rolled_back() {
    let (store, engine) = memory_store(StoreConfig::default());

    let err = Executor::new(&store)
        .write(|tx| {
            tx.put(test_entity(Some("doomed"), 1))?;
            Err::<(), _>(InternalError::engine_storage("abort"))
        })
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Storage);
    assert_eq!(engine.open_cursors(), 0);
    assert!(store.get(1).unwrap().is_none());

    // the writer lock was released with the cursor
    let id = store.put(test_entity(Some("kept"), 2)).unwrap();
    assert_eq!(store.get(id).unwrap().map(|e: TestEntity| e.simple_int), Some(2));
}

use crate::{
    db::{
        Store,
        query::QueryError,
        reactive::subscription::{DataObserver, ErrorObserver},
    },
    obs::sink::{self, MetricsEvent},
    traits::EntityKind,
};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

///
/// ObserverEntry
///
/// `delivered` holds the sequence of the newest result handed to this
/// observer; its lock also serializes calls into the observer.
///

pub(crate) struct ObserverEntry<E> {
    observer: Arc<dyn DataObserver<Vec<E>>>,
    on_error: Option<Arc<dyn ErrorObserver>>,
    canceled: Arc<AtomicBool>,
    delivered: Arc<Mutex<u64>>,
}

impl<E> Clone for ObserverEntry<E> {
    fn clone(&self) -> Self {
        Self {
            observer: Arc::clone(&self.observer),
            on_error: self.on_error.clone(),
            canceled: Arc::clone(&self.canceled),
            delivered: Arc::clone(&self.delivered),
        }
    }
}

impl<E> ObserverEntry<E> {
    pub(crate) fn new(
        observer: Arc<dyn DataObserver<Vec<E>>>,
        on_error: Option<Arc<dyn ErrorObserver>>,
        canceled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            observer,
            on_error,
            canceled,
            delivered: Arc::new(Mutex::new(0)),
        }
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

///
/// Publisher
///
/// Observer registry of one query, in subscription order. Canceled
/// entries are pruned whenever the registry is read. Every execution that
/// feeds observers draws a sequence number first, so an observer never
/// receives a result older than one it already has.
///

pub(crate) struct Publisher<E> {
    observers: Mutex<Vec<ObserverEntry<E>>>,
    sequence: AtomicU64,
}

impl<E> Default for Publisher<E> {
    fn default() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<E: EntityKind> Publisher<E> {
    /// Sequence for the next execution; starts at 1.
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn add(&self, entry: ObserverEntry<E>) {
        self.observers.lock().push(entry);
    }

    /// Live observers, in subscription order.
    pub(crate) fn active(&self) -> Vec<ObserverEntry<E>> {
        let mut observers = self.observers.lock();
        observers.retain(|entry| !entry.is_canceled());

        observers.clone()
    }
}

/// Queue one delivery of `result` to `entry` on the store's worker pool.
/// A result whose `sequence` is not newer than the observer's last one is
/// dropped.
pub(crate) fn deliver<E: EntityKind>(
    store: &Store<E>,
    entry: ObserverEntry<E>,
    sequence: u64,
    result: Result<Vec<E>, QueryError>,
) {
    store.spawn(move || {
        if entry.is_canceled() {
            tracing::trace!(entity = E::MODEL.entity_name, "skipping canceled observer");
            return;
        }

        let mut delivered = entry.delivered.lock();
        if *delivered >= sequence {
            tracing::trace!(
                entity = E::MODEL.entity_name,
                sequence,
                newest = *delivered,
                "dropping superseded result"
            );
            return;
        }
        *delivered = sequence;

        match result {
            Ok(data) => {
                entry.observer.on_data(data);
                sink::record(MetricsEvent::Delivery);
            }
            Err(err) => match &entry.on_error {
                Some(on_error) => on_error.on_error(err),
                None => tracing::warn!(
                    entity = E::MODEL.entity_name,
                    error = %err,
                    "query observer failed and has no error observer"
                ),
            },
        }
    });
}

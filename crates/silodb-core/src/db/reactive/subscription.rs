use crate::db::{
    query::{Query, QueryError},
    reactive::publisher::ObserverEntry,
};
use crate::traits::EntityKind;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

///
/// DataObserver
/// Receives query results on the store's worker pool.
///

pub trait DataObserver<T>: Send + Sync {
    fn on_data(&self, data: T);
}

impl<T, F> DataObserver<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn on_data(&self, data: T) {
        self(data);
    }
}

///
/// ErrorObserver
///

pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, err: QueryError);
}

impl<F> ErrorObserver for F
where
    F: Fn(QueryError) + Send + Sync,
{
    fn on_error(&self, err: QueryError) {
        self(err);
    }
}

///
/// DataSubscription
///
/// Cancellation handle for one observer. Dropping the handle does not
/// cancel; delivery stops on `cancel` or once every clone of the owning
/// query is gone.
///

#[derive(Clone, Debug, Default)]
pub struct DataSubscription {
    canceled: Arc<AtomicBool>,
}

impl DataSubscription {
    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

///
/// DataSubscriptionList
/// Groups subscriptions so they can be canceled together.
///

#[derive(Debug, Default)]
pub struct DataSubscriptionList {
    subscriptions: Mutex<Vec<DataSubscription>>,
}

impl DataSubscriptionList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscription: DataSubscription) {
        self.subscriptions.lock().push(subscription);
    }

    /// Cancel every member and empty the list.
    pub fn cancel(&self) {
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.cancel();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }
}

///
/// SubscriptionBuilder
///

pub struct SubscriptionBuilder<'q, E: EntityKind> {
    query: &'q Query<E>,
    on_error: Option<Arc<dyn ErrorObserver>>,
    list: Option<&'q DataSubscriptionList>,
}

impl<'q, E: EntityKind> SubscriptionBuilder<'q, E> {
    pub(crate) const fn new(query: &'q Query<E>) -> Self {
        Self {
            query,
            on_error: None,
            list: None,
        }
    }

    /// Receive execution failures instead of having them logged.
    #[must_use]
    pub fn on_error(mut self, observer: impl ErrorObserver + 'static) -> Self {
        self.on_error = Some(Arc::new(observer));
        self
    }

    /// Also register the subscription with `list`.
    #[must_use]
    pub fn subscription_list(mut self, list: &'q DataSubscriptionList) -> Self {
        self.list = Some(list);
        self
    }

    /// Register `observer` and replay the current results to it.
    pub fn observer(self, observer: impl DataObserver<Vec<E>> + 'static) -> DataSubscription {
        let subscription = DataSubscription::default();
        let entry = ObserverEntry::new(Arc::new(observer), self.on_error, subscription.flag());

        if let Some(list) = self.list {
            list.add(subscription.clone());
        }
        self.query.attach(entry);

        subscription
    }
}

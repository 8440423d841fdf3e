pub mod engine;
pub mod executor;
pub mod query;
pub mod reactive;
pub mod relation;

use crate::{
    config::{ConfigError, StoreConfig},
    db::{
        engine::StorageEngine,
        executor::{Executor, RetryPolicy},
        query::builder::QueryBuilder,
    },
    error::InternalError,
    traits::{EntityId, EntityKind},
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{Arc, Weak},
};

///
/// ExceptionListener
///
/// Store-wide hook that sees every storage failure (uniqueness violations,
/// exhausted retries, fatal engine errors) before it reaches the caller.
///

pub trait ExceptionListener: Send + Sync {
    fn on_exception(&self, err: &InternalError);
}

impl<F> ExceptionListener for F
where
    F: Fn(&InternalError) + Send + Sync,
{
    fn on_exception(&self, err: &InternalError) {
        self(err);
    }
}

///
/// TxFailureObserver
/// Called once a retried read transaction has used up its attempts.
///

pub trait TxFailureObserver: Send + Sync {
    fn on_tx_failure(&self, err: &InternalError);
}

impl<F> TxFailureObserver for F
where
    F: Fn(&InternalError) + Send + Sync,
{
    fn on_tx_failure(&self, err: &InternalError) {
        self(err);
    }
}

///
/// StoreRuntime
///
/// State shared by every entity store opened from one builder: config,
/// the reactive delivery pool and the failure hooks.
///

pub(crate) struct StoreRuntime {
    config: StoreConfig,
    retry: RetryPolicy,
    pool: rayon::ThreadPool,
    exception_listener: RwLock<Option<Arc<dyn ExceptionListener>>>,
    tx_failure_observer: RwLock<Option<Arc<dyn TxFailureObserver>>>,
}

impl StoreRuntime {
    fn new(config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("silodb-observer-{i}"))
            .build()
            .map_err(|err| ConfigError::WorkerPool(err.to_string()))?;

        Ok(Self {
            retry: config.retry_policy(),
            config,
            pool,
            exception_listener: RwLock::new(None),
            tx_failure_observer: RwLock::new(None),
        })
    }
}

///
/// StoreBuilder
///

pub struct StoreBuilder<E: EntityKind> {
    engine: Arc<dyn StorageEngine<E>>,
    config: StoreConfig,
    exception_listener: Option<Arc<dyn ExceptionListener>>,
    tx_failure_observer: Option<Arc<dyn TxFailureObserver>>,
}

impl<E: EntityKind> StoreBuilder<E> {
    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn query_attempts(mut self, attempts: u32) -> Self {
        self.config = self.config.query_attempts(attempts);
        self
    }

    #[must_use]
    pub fn failed_read_tx_attempt_observer(
        mut self,
        observer: impl TxFailureObserver + 'static,
    ) -> Self {
        self.tx_failure_observer = Some(Arc::new(observer));
        self
    }

    #[must_use]
    pub fn exception_listener(mut self, listener: impl ExceptionListener + 'static) -> Self {
        self.exception_listener = Some(Arc::new(listener));
        self
    }

    pub fn build(self) -> Result<Store<E>, ConfigError> {
        let runtime = StoreRuntime::new(self.config)?;
        *runtime.exception_listener.write() = self.exception_listener;
        *runtime.tx_failure_observer.write() = self.tx_failure_observer;

        Ok(Store {
            engine: self.engine,
            runtime: Arc::new(runtime),
        })
    }
}

///
/// Store
///
/// Entry point for one entity type: puts, gets and query building over a
/// storage engine. Cloning is cheap and shares the engine and runtime.
///

pub struct Store<E: EntityKind> {
    engine: Arc<dyn StorageEngine<E>>,
    runtime: Arc<StoreRuntime>,
}

impl<E: EntityKind> Clone for Store<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl<E: EntityKind> fmt::Debug for Store<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("entity", &E::MODEL.entity_name)
            .field("config", &self.runtime.config)
            .finish_non_exhaustive()
    }
}

impl<E: EntityKind> Store<E> {
    #[must_use]
    pub fn builder(engine: Arc<dyn StorageEngine<E>>) -> StoreBuilder<E> {
        StoreBuilder {
            engine,
            config: StoreConfig::default(),
            exception_listener: None,
            tx_failure_observer: None,
        }
    }

    /// Open a store with the default configuration.
    pub fn open(engine: Arc<dyn StorageEngine<E>>) -> Result<Self, ConfigError> {
        Self::builder(engine).build()
    }

    /// Non-owning handle, for relation loaders stored inside entities.
    #[must_use]
    pub fn downgrade(&self) -> WeakStore<E> {
        WeakStore {
            engine: Arc::downgrade(&self.engine),
            runtime: Arc::downgrade(&self.runtime),
        }
    }

    /// Open a store for another entity type on the same runtime, sharing
    /// config, worker pool and failure hooks.
    #[must_use]
    pub fn sibling<T: EntityKind>(&self, engine: Arc<dyn StorageEngine<T>>) -> Store<T> {
        Store {
            engine,
            runtime: Arc::clone(&self.runtime),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.runtime.config
    }

    pub fn set_exception_listener(&self, listener: Option<Arc<dyn ExceptionListener>>) {
        *self.runtime.exception_listener.write() = listener;
    }

    pub fn set_tx_failure_observer(&self, observer: Option<Arc<dyn TxFailureObserver>>) {
        *self.runtime.tx_failure_observer.write() = observer;
    }

    // ---- entry points ---------------------------------------------------

    /// Start building a query over this store.
    #[must_use]
    pub fn query(&self) -> QueryBuilder<E> {
        QueryBuilder::new(self.clone())
    }

    /// Insert or overwrite one entity; returns its (possibly new) id.
    pub fn put(&self, entity: E) -> Result<EntityId, InternalError> {
        Executor::new(self).write(|tx| tx.put(entity))
    }

    /// Insert or overwrite several entities in one write transaction.
    pub fn put_many(
        &self,
        entities: impl IntoIterator<Item = E>,
    ) -> Result<Vec<EntityId>, InternalError> {
        Executor::new(self).write(|tx| entities.into_iter().map(|e| tx.put(e)).collect())
    }

    pub fn get(&self, id: EntityId) -> Result<Option<E>, InternalError> {
        Executor::new(self).read(|tx| tx.get(id))
    }

    // ---- runtime plumbing -----------------------------------------------

    pub(crate) fn engine(&self) -> &dyn StorageEngine<E> {
        self.engine.as_ref()
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.runtime.retry
    }

    pub(crate) fn log_query_parameters(&self) -> bool {
        self.runtime.config.log_query_parameters
    }

    /// Queue a job on the reactive delivery pool.
    pub(crate) fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.runtime.pool.spawn(job);
    }

    /// Forward storage failures to the exception listener, then pass the
    /// result through unchanged.
    pub(crate) fn observe<T>(&self, result: Result<T, InternalError>) -> Result<T, InternalError> {
        if let Err(err) = &result
            && err.is_storage_failure()
        {
            let listener = self.runtime.exception_listener.read().clone();
            if let Some(listener) = listener {
                listener.on_exception(err);
            }
        }

        result
    }

    pub(crate) fn notify_tx_failure(&self, err: &InternalError) {
        let observer = self.runtime.tx_failure_observer.read().clone();
        if let Some(observer) = observer {
            observer.on_tx_failure(err);
        }
    }
}

///
/// WeakStore
/// Store handle that does not keep the engine or runtime alive.
///

pub struct WeakStore<E: EntityKind> {
    engine: Weak<dyn StorageEngine<E>>,
    runtime: Weak<StoreRuntime>,
}

impl<E: EntityKind> WeakStore<E> {
    /// The store, if any strong handle to it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Store<E>> {
        Some(Store {
            engine: self.engine.upgrade()?,
            runtime: self.runtime.upgrade()?,
        })
    }
}

impl<E: EntityKind> Clone for WeakStore<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Weak::clone(&self.engine),
            runtime: Weak::clone(&self.runtime),
        }
    }
}

impl<E: EntityKind> fmt::Debug for WeakStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("entity", &E::MODEL.entity_name)
            .field("alive", &(self.engine.strong_count() > 0))
            .finish()
    }
}

use crate::{
    db::{
        Store,
        engine::{ExecMode, QueryHandle},
        executor::Executor,
        query::{
            error::{CapabilityError, QueryError},
            lazy::LazyResultList,
            param::{ParamTarget, SlotTable, validate_operand},
            predicate::{Operand, Predicate},
        },
        reactive::{self, DataSubscriptionList, ObserverEntry, Publisher, SubscriptionBuilder},
        relation::{EagerRelation, resolve_at},
    },
    error::InternalError,
    model::Property,
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    traits::{EntityId, EntityKind},
    value::Value,
};
use parking_lot::Mutex;
use std::{cmp::Ordering, fmt, ops::ControlFlow, sync::Arc};

pub(crate) type QueryFilter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
pub(crate) type QueryComparator<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

///
/// Query
///
/// Compiled, reusable query. The condition tree is fixed; leaf operands
/// can be rebound with `set_parameter*`. Clones share the compiled handle,
/// which is released by `close` or when the last clone drops.
///

pub struct Query<E: EntityKind> {
    inner: Arc<QueryInner<E>>,
}

struct QueryInner<E: EntityKind> {
    store: Store<E>,
    handle: Mutex<Option<QueryHandle>>,
    has_order: bool,
    slots: SlotTable,
    filter: Option<QueryFilter<E>>,
    comparator: Option<QueryComparator<E>>,
    eager: Vec<EagerRelation<E>>,
    publisher: Publisher<E>,
}

impl<E: EntityKind> QueryInner<E> {
    fn release(&self) -> bool {
        let Some(handle) = self.handle.lock().take() else {
            return false;
        };
        self.store.engine().destroy(handle);
        tracing::debug!(entity = E::MODEL.entity_name, %handle, "query closed");

        true
    }
}

impl<E: EntityKind> Drop for QueryInner<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: EntityKind> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: EntityKind> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &E::MODEL.entity_name)
            .field("handle", &*self.inner.handle.lock())
            .field("has_order", &self.inner.has_order)
            .field("filter", &self.inner.filter.is_some())
            .field("comparator", &self.inner.comparator.is_some())
            .field("eager", &self.inner.eager)
            .finish()
    }
}

impl<E: EntityKind> Query<E> {
    pub(crate) fn new(
        store: Store<E>,
        handle: QueryHandle,
        predicate: &Predicate,
        has_order: bool,
        filter: Option<QueryFilter<E>>,
        comparator: Option<QueryComparator<E>>,
        eager: Vec<EagerRelation<E>>,
    ) -> Self {
        Self {
            inner: Arc::new(QueryInner {
                store,
                handle: Mutex::new(Some(handle)),
                has_order,
                slots: SlotTable::from_predicate::<E>(predicate),
                filter,
                comparator,
                eager,
                publisher: Publisher::default(),
            }),
        }
    }

    // ---- lifecycle ------------------------------------------------------

    /// Release the compiled handle. Closing twice is a no-op; any other
    /// use afterwards fails with `UseAfterClose`.
    pub fn close(&self) {
        self.inner.release();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.handle.lock().is_none()
    }

    // ---- single-entity reads (retried) ----------------------------------

    /// First match in query order.
    pub fn find_first(&self) -> Result<Option<E>, QueryError> {
        self.find_single("find_first", ExecMode::First)
    }

    /// The only match; more than one match is a `NotUnique` error.
    pub fn find_unique(&self) -> Result<Option<E>, QueryError> {
        self.find_single("find_unique", ExecMode::Unique)
    }

    // ---- list reads (retried) -------------------------------------------

    /// All matches: filter applied, eager relations resolved, then sorted
    /// by the comparator if one is attached.
    pub fn find(&self) -> Result<Vec<E>, QueryError> {
        let inner = &self.inner;
        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Find);

        let mut rows =
            Executor::new(&inner.store).read_with_retry(inner.store.retry_policy(), |tx| {
                let mut rows = tx
                    .execute(handle, ExecMode::Find { offset: 0, limit: 0 })?
                    .into_entities()?;
                if let Some(filter) = &inner.filter {
                    rows.retain(|entity| filter(entity));
                }
                for (index, entity) in rows.iter().enumerate() {
                    resolve_at(&inner.eager, entity, index)?;
                }

                Ok(rows)
            })?;

        if let Some(comparator) = &inner.comparator {
            rows.sort_by(|a, b| comparator(a, b));
        }
        span.set_rows(rows.len() as u64);

        Ok(rows)
    }

    /// Page of matches; `limit == 0` means no limit.
    pub fn find_range(&self, offset: u64, limit: u64) -> Result<Vec<E>, QueryError> {
        self.ensure_plain("find_range")?;

        let inner = &self.inner;
        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Find);

        let rows = Executor::new(&inner.store).read_with_retry(inner.store.retry_policy(), |tx| {
            let rows = tx
                .execute(handle, ExecMode::Find { offset, limit })?
                .into_entities()?;
            for (index, entity) in rows.iter().enumerate() {
                resolve_at(&inner.eager, entity, index)?;
            }

            Ok(rows)
        })?;
        span.set_rows(rows.len() as u64);

        Ok(rows)
    }

    // ---- single-transaction reads ---------------------------------------

    /// Matching ids in storage order. Rejected for ordered queries; an
    /// attached filter is not applied.
    pub fn find_ids(&self) -> Result<Vec<EntityId>, QueryError> {
        if self.inner.has_order {
            return Err(CapabilityError::Ordered { method: "find_ids" }.into());
        }

        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Ids);
        let ids = Executor::new(&self.inner.store)
            .read(|tx| tx.execute(handle, ExecMode::IdsUnordered)?.into_ids())?;
        span.set_rows(ids.len() as u64);

        Ok(ids)
    }

    /// Lazy list that re-reads entities on every access.
    pub fn find_lazy(&self) -> Result<LazyResultList<E>, QueryError> {
        self.lazy("find_lazy", false)
    }

    /// Lazy list that keeps entities once read.
    pub fn find_lazy_cached(&self) -> Result<LazyResultList<E>, QueryError> {
        self.lazy("find_lazy_cached", true)
    }

    /// Stream matches to `consumer` inside one read transaction, in id
    /// order. Returning `ControlFlow::Break` stops the iteration. The
    /// consumer must not write to the store.
    pub fn for_each(
        &self,
        mut consumer: impl FnMut(E) -> ControlFlow<()>,
    ) -> Result<(), QueryError> {
        if self.inner.comparator.is_some() {
            return Err(CapabilityError::Comparator { method: "for_each" }.into());
        }
        if self.inner.has_order {
            return Err(CapabilityError::Ordered { method: "for_each" }.into());
        }

        let inner = &self.inner;
        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Find);
        let mut delivered = 0_u64;

        Executor::new(&inner.store).read(|tx| {
            let ids = tx.execute(handle, ExecMode::IdsUnordered)?.into_ids()?;
            let list = LazyResultList::new(inner.store.clone(), ids, false);

            for index in 0..list.len() {
                let Some(entity) = list.get_in(tx, index)? else {
                    return Err(InternalError::query_invariant(format!(
                        "entity {} vanished during for_each",
                        list.id(index).unwrap_or_default()
                    )));
                };
                if let Some(filter) = &inner.filter
                    && !filter(&entity)
                {
                    continue;
                }
                resolve_at(&inner.eager, &entity, index)?;

                delivered += 1;
                if consumer(entity).is_break() {
                    break;
                }
            }

            Ok(())
        })?;
        span.set_rows(delivered);

        Ok(())
    }

    pub fn count(&self) -> Result<u64, QueryError> {
        let handle = self.handle()?;
        let _span = Span::<E>::new(ExecKind::Aggregate);

        Ok(Executor::new(&self.inner.store)
            .read(|tx| tx.execute(handle, ExecMode::Count)?.into_count())?)
    }

    // ---- aggregates -----------------------------------------------------

    /// Integer sum over an integral property; overflow is an error.
    pub fn sum(&self, property: &Property) -> Result<i64, QueryError> {
        self.aggregate_long(ExecMode::Sum(property.id))
    }

    pub fn sum_double(&self, property: &Property) -> Result<f64, QueryError> {
        self.aggregate_double(ExecMode::SumDouble(property.id))
    }

    /// Minimum of an integral property; 0 when nothing matches.
    pub fn min(&self, property: &Property) -> Result<i64, QueryError> {
        self.aggregate_long(ExecMode::Min(property.id))
    }

    pub fn min_double(&self, property: &Property) -> Result<f64, QueryError> {
        self.aggregate_double(ExecMode::MinDouble(property.id))
    }

    /// Maximum of an integral property; 0 when nothing matches.
    pub fn max(&self, property: &Property) -> Result<i64, QueryError> {
        self.aggregate_long(ExecMode::Max(property.id))
    }

    pub fn max_double(&self, property: &Property) -> Result<f64, QueryError> {
        self.aggregate_double(ExecMode::MaxDouble(property.id))
    }

    /// Average of any numeric property; NaN when nothing matches.
    pub fn avg(&self, property: &Property) -> Result<f64, QueryError> {
        self.aggregate_double(ExecMode::Avg(property.id))
    }

    // ---- writes ---------------------------------------------------------

    /// Delete every match; returns the number removed. Filters do not apply.
    pub fn remove(&self) -> Result<u64, QueryError> {
        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Remove);
        let removed = Executor::new(&self.inner.store)
            .write(|tx| tx.execute(handle, ExecMode::Remove)?.into_removed())?;
        span.set_rows(removed);

        Ok(removed)
    }

    // ---- parameters -----------------------------------------------------

    /// Rebind the single-value operand of the condition on `property`.
    pub fn set_parameter(
        &self,
        property: &Property,
        value: impl Into<Value>,
    ) -> Result<(), QueryError> {
        self.rebind(ParamTarget::Property(property), Operand::Single(value.into()))
    }

    /// Rebind both bounds of a `between` condition.
    pub fn set_parameters(
        &self,
        property: &Property,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<(), QueryError> {
        self.rebind(
            ParamTarget::Property(property),
            Operand::Pair(low.into(), high.into()),
        )
    }

    /// Rebind the value list of an `in` / `not in` condition.
    pub fn set_parameter_list<V: Into<Value>>(
        &self,
        property: &Property,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), QueryError> {
        self.rebind(
            ParamTarget::Property(property),
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn set_parameter_alias(
        &self,
        alias: &str,
        value: impl Into<Value>,
    ) -> Result<(), QueryError> {
        self.rebind(ParamTarget::Alias(alias), Operand::Single(value.into()))
    }

    pub fn set_parameters_alias(
        &self,
        alias: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<(), QueryError> {
        self.rebind(
            ParamTarget::Alias(alias),
            Operand::Pair(low.into(), high.into()),
        )
    }

    pub fn set_parameter_list_alias<V: Into<Value>>(
        &self,
        alias: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), QueryError> {
        self.rebind(
            ParamTarget::Alias(alias),
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    // ---- reactive -------------------------------------------------------

    /// Start a subscription; finish it with `.observer(..)`.
    #[must_use]
    pub const fn subscribe(&self) -> SubscriptionBuilder<'_, E> {
        SubscriptionBuilder::new(self)
    }

    /// Subscription registered with `list` for grouped cancellation.
    #[must_use]
    pub fn subscribe_with<'q>(
        &'q self,
        list: &'q DataSubscriptionList,
    ) -> SubscriptionBuilder<'q, E> {
        SubscriptionBuilder::new(self).subscription_list(list)
    }

    /// Re-run the query and deliver the result to every live observer.
    /// Rebinding parameters never publishes on its own. Returns the number
    /// of observers notified.
    pub fn publish(&self) -> usize {
        let observers = self.inner.publisher.active();
        if observers.is_empty() {
            return 0;
        }

        let sequence = self.inner.publisher.next_sequence();
        let result = self.find();
        sink::record(MetricsEvent::Publish {
            entity: E::MODEL.entity_name,
            observers: observers.len() as u64,
        });
        tracing::debug!(
            entity = E::MODEL.entity_name,
            observers = observers.len(),
            ok = result.is_ok(),
            "publishing query results"
        );

        let count = observers.len();
        for entry in observers {
            reactive::deliver(&self.inner.store, entry, sequence, result.clone());
        }

        count
    }

    /// Register an observer and replay the current result to it alone.
    pub(crate) fn attach(&self, entry: ObserverEntry<E>) {
        self.inner.publisher.add(entry.clone());

        let sequence = self.inner.publisher.next_sequence();
        let result = self.find();
        reactive::deliver(&self.inner.store, entry, sequence, result);
    }

    // ---- internals ------------------------------------------------------

    fn handle(&self) -> Result<QueryHandle, QueryError> {
        self.inner
            .handle
            .lock()
            .ok_or_else(|| InternalError::use_after_close("query").into())
    }

    /// Reject terminals that cannot honor a filter or comparator.
    fn ensure_plain(&self, method: &'static str) -> Result<(), QueryError> {
        if self.inner.filter.is_some() {
            return Err(CapabilityError::Filter { method }.into());
        }
        if self.inner.comparator.is_some() {
            return Err(CapabilityError::Comparator { method }.into());
        }

        Ok(())
    }

    fn find_single(&self, method: &'static str, mode: ExecMode) -> Result<Option<E>, QueryError> {
        self.ensure_plain(method)?;

        let inner = &self.inner;
        let handle = self.handle()?;
        let mut span = Span::<E>::new(ExecKind::Find);

        let entity =
            Executor::new(&inner.store).read_with_retry(inner.store.retry_policy(), |tx| {
                let entity = tx.execute(handle, mode)?.into_entity()?;
                if let Some(entity) = &entity {
                    resolve_at(&inner.eager, entity, 0)?;
                }

                Ok(entity)
            })?;
        span.set_rows(u64::from(entity.is_some()));

        Ok(entity)
    }

    fn lazy(&self, method: &'static str, cached: bool) -> Result<LazyResultList<E>, QueryError> {
        self.ensure_plain(method)?;
        let ids = self.find_ids()?;

        Ok(LazyResultList::new(self.inner.store.clone(), ids, cached))
    }

    fn aggregate_long(&self, mode: ExecMode) -> Result<i64, QueryError> {
        let handle = self.handle()?;
        let _span = Span::<E>::new(ExecKind::Aggregate);

        Ok(Executor::new(&self.inner.store)
            .read(|tx| tx.execute(handle, mode)?.into_long())?)
    }

    fn aggregate_double(&self, mode: ExecMode) -> Result<f64, QueryError> {
        let handle = self.handle()?;
        let _span = Span::<E>::new(ExecKind::Aggregate);

        Ok(Executor::new(&self.inner.store)
            .read(|tx| tx.execute(handle, mode)?.into_double())?)
    }

    fn rebind(&self, target: ParamTarget<'_>, operand: Operand) -> Result<(), QueryError> {
        let handle = self.handle()?;
        let (slot, address) = self.inner.slots.resolve(target)?;
        validate_operand(target, slot, &operand)?;

        if self.inner.store.log_query_parameters() {
            tracing::debug!(
                entity = E::MODEL.entity_name,
                %handle,
                %target,
                alias = ?address.alias,
                ?operand,
                "query parameter rebound"
            );
        }
        self.inner.store.engine().bind(handle, &address, operand)?;

        Ok(())
    }
}

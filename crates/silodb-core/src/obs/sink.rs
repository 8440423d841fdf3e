//! Metrics sink boundary.
//!
//! Query and executor code never touch `obs::metrics` directly; all
//! instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::{obs::metrics, traits::EntityKind};
use std::{cell::RefCell, marker::PhantomData};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Find,
    Ids,
    Aggregate,
    Remove,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricsEvent {
    QueryCompiled {
        entity: &'static str,
    },
    ExecStart {
        kind: ExecKind,
        entity: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity: &'static str,
        rows: u64,
    },
    TxRetry {
        attempt: u32,
    },
    TxRetryExhausted {
        attempts: u32,
    },
    Publish {
        entity: &'static str,
        observers: u64,
    },
    Delivery,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-wide sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::QueryCompiled { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.queries_compiled = m.ops.queries_compiled.saturating_add(1);
                });
            }

            MetricsEvent::ExecStart { kind, entity } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Find => m.ops.find_calls = m.ops.find_calls.saturating_add(1),
                        ExecKind::Ids => m.ops.id_calls = m.ops.id_calls.saturating_add(1),
                        ExecKind::Aggregate => {
                            m.ops.aggregate_calls = m.ops.aggregate_calls.saturating_add(1);
                        }
                        ExecKind::Remove => {
                            m.ops.remove_calls = m.ops.remove_calls.saturating_add(1);
                        }
                    }

                    let entry = m.entity(entity);
                    match kind {
                        ExecKind::Find | ExecKind::Ids => {
                            entry.find_calls = entry.find_calls.saturating_add(1);
                        }
                        ExecKind::Aggregate => {
                            entry.aggregate_calls = entry.aggregate_calls.saturating_add(1);
                        }
                        ExecKind::Remove => {
                            entry.remove_calls = entry.remove_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish { kind, entity, rows } => {
                metrics::with_state_mut(|m| match kind {
                    ExecKind::Find => {
                        m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                        let entry = m.entity(entity);
                        entry.rows_loaded = entry.rows_loaded.saturating_add(rows);
                    }
                    ExecKind::Remove => {
                        m.ops.rows_removed = m.ops.rows_removed.saturating_add(rows);
                        let entry = m.entity(entity);
                        entry.rows_removed = entry.rows_removed.saturating_add(rows);
                    }
                    ExecKind::Ids | ExecKind::Aggregate => {}
                });
            }

            MetricsEvent::TxRetry { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.tx_retries = m.ops.tx_retries.saturating_add(1);
                });
            }

            MetricsEvent::TxRetryExhausted { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.tx_retries_exhausted = m.ops.tx_retries_exhausted.saturating_add(1);
                });
            }

            MetricsEvent::Publish { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.publishes = m.ops.publishes.saturating_add(1);
                    let entry = m.entity(entity);
                    entry.publishes = entry.publishes.saturating_add(1);
                });
            }

            MetricsEvent::Delivery => {
                metrics::with_state_mut(|m| {
                    m.ops.deliveries = m.ops.deliveries.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` comes from a live `&dyn MetricsSink` installed by `with_metrics_sink`
        //   on this thread, which restores the previous slot on every exit (unwind included).
        // - `record` dereferences synchronously and never stores `ptr`.
        // - Only a shared reference is materialized.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current process-wide counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all process-wide counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override for the current thread.
///
/// Events recorded on other threads (reactive deliveries on the worker pool)
/// still go to the global sink.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The pointer is installed only for this dynamic scope; `Guard` restores
    //   the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one terminal operation.
/// Finish accounting happens on drop, so error and unwind paths are counted.
///

pub(crate) struct Span<E: EntityKind> {
    kind: ExecKind,
    rows: u64,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Span<E> {
    #[must_use]
    pub(crate) fn new(kind: ExecKind) -> Self {
        record(MetricsEvent::ExecStart {
            kind,
            entity: E::MODEL.entity_name,
        });

        Self {
            kind,
            rows: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl<E: EntityKind> Drop for Span<E> {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity: E::MODEL.entity_name,
            rows: self.rows,
        });
    }
}

///
/// TESTS
///

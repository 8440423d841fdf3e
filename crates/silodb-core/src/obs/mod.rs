//! Observability: runtime counters and the sink abstraction that feeds them.
//!
//! Logging goes through `tracing` at the call sites; this module only
//! covers structured metrics.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EventOps, EventReport};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};

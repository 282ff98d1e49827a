//! Observability: runtime counters and the sink abstraction.
//!
//! Text diagnostics go through the `log` facade at the call sites;
//! this module only owns structured counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, ModelCounters, ModelSummary};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};

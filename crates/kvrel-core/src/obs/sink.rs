//! Metrics sink boundary.
//!
//! Relation and cascade logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    ModelDefined {
        model: &'a str,
        relations: u64,
    },
    DefinitionRejected {
        model: &'a str,
    },
    TargetResolved {
        model: &'a str,
    },
    ReverseLookup {
        model: &'a str,
        rows: u64,
    },
    Cascade {
        model: &'a str,
        cleared: u64,
        removed: u64,
    },
    DeleteBlocked {
        model: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::ModelDefined { model, relations } => {
                metrics::with_state_mut(|m| {
                    m.ops.models_defined = m.ops.models_defined.saturating_add(1);
                    m.ops.relations_registered =
                        m.ops.relations_registered.saturating_add(relations);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.relations_registered =
                        entry.relations_registered.saturating_add(relations);
                });
            }

            MetricsEvent::DefinitionRejected { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.definitions_rejected = m.ops.definitions_rejected.saturating_add(1);
                });
            }

            MetricsEvent::TargetResolved { model } => {
                metrics::with_state_mut(|m| {
                    m.ops.targets_resolved = m.ops.targets_resolved.saturating_add(1);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.targets_resolved = entry.targets_resolved.saturating_add(1);
                });
            }

            MetricsEvent::ReverseLookup { model, rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.reverse_lookups = m.ops.reverse_lookups.saturating_add(1);
                    m.ops.reverse_rows = m.ops.reverse_rows.saturating_add(rows);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.reverse_lookups = entry.reverse_lookups.saturating_add(1);
                    entry.reverse_rows = entry.reverse_rows.saturating_add(rows);
                });
            }

            MetricsEvent::Cascade {
                model,
                cleared,
                removed,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.cascades = m.ops.cascades.saturating_add(1);
                    m.ops.cascade_clears = m.ops.cascade_clears.saturating_add(cleared);
                    m.ops.cascade_removes = m.ops.cascade_removes.saturating_add(removed);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.cascades = entry.cascades.saturating_add(1);
                    entry.cascade_clears = entry.cascade_clears.saturating_add(cleared);
                    entry.cascade_removes = entry.cascade_removes.saturating_add(removed);
                });
            }

            MetricsEvent::DeleteBlocked { model } => {
                metrics::with_state_mut(|m| {
                    m.ops.delete_blocks = m.ops.delete_blocks.saturating_add(1);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.delete_blocks = entry.delete_blocks.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::since_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state for the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
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
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

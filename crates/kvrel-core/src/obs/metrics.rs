use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for definitions, lookups, and cascades.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub models: BTreeMap<String, ModelCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            models: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Definition time
    pub models_defined: u64,
    pub relations_registered: u64,
    pub definitions_rejected: u64,

    // Resolution
    pub targets_resolved: u64,

    // Reverse accessors
    pub reverse_lookups: u64,
    pub reverse_rows: u64,

    // Cascades
    pub cascades: u64,
    pub cascade_clears: u64,
    pub cascade_removes: u64,
    pub delete_blocks: u64,
}

///
/// ModelCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelCounters {
    pub relations_registered: u64,
    pub targets_resolved: u64,
    pub reverse_lookups: u64,
    pub reverse_rows: u64,
    pub cascades: u64,
    pub cascade_clears: u64,
    pub cascade_removes: u64,
    pub delete_blocks: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-model counters, busiest reverse lookups first.
    pub model_counters: Vec<ModelSummary>,
}

///
/// ModelSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub relations_registered: u64,
    pub reverse_lookups: u64,
    pub reverse_rows: u64,
    pub avg_rows_per_lookup: f64,
    pub cascades: u64,
    pub cascade_clears: u64,
    pub cascade_removes: u64,
    pub delete_blocks: u64,
}

/// Build a report from in-memory counters.
///
/// When `window_start_ms` is later than the current window start the
/// counters are omitted, since they cover an older window.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.since_ms) {
        return EventReport::default();
    }

    let mut model_counters: Vec<ModelSummary> = snap
        .models
        .iter()
        .map(|(model, c)| ModelSummary {
            model: model.clone(),
            relations_registered: c.relations_registered,
            reverse_lookups: c.reverse_lookups,
            reverse_rows: c.reverse_rows,
            avg_rows_per_lookup: if c.reverse_lookups > 0 {
                c.reverse_rows as f64 / c.reverse_lookups as f64
            } else {
                0.0
            },
            cascades: c.cascades,
            cascade_clears: c.cascade_clears,
            cascade_removes: c.cascade_removes,
            delete_blocks: c.delete_blocks,
        })
        .collect();

    model_counters.sort_by(|a, b| {
        b.reverse_lookups
            .cmp(&a.reverse_lookups)
            .then_with(|| a.model.cmp(&b.model))
    });

    EventReport {
        counters: Some(snap),
        model_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.cascades = 3;
            m.models.insert(
                "tests:person".to_string(),
                ModelCounters {
                    cascades: 3,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.cascades, 0);
            assert!(m.models.is_empty());
        });
    }

    #[test]
    fn report_orders_models_by_lookups_then_name() {
        reset_all();
        with_state_mut(|m| {
            for (name, lookups, rows) in [("tests:b", 2, 6), ("tests:a", 2, 2), ("tests:c", 5, 5)]
            {
                m.models.insert(
                    name.to_string(),
                    ModelCounters {
                        reverse_lookups: lookups,
                        reverse_rows: rows,
                        ..Default::default()
                    },
                );
            }
        });

        let report = report_window_start(None);
        let names: Vec<_> = report
            .model_counters
            .iter()
            .map(|s| s.model.as_str())
            .collect();

        assert_eq!(names, ["tests:c", "tests:a", "tests:b"]);
        assert_eq!(report.model_counters[2].avg_rows_per_lookup, 3.0);
    }

    #[test]
    fn future_window_start_omits_counters() {
        reset_all();
        let report = report_window_start(Some(u64::MAX));

        assert!(report.counters.is_none());
        assert!(report.model_counters.is_empty());
    }
}

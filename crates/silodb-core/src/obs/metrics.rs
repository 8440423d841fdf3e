use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// EventState
/// Ephemeral, process-wide counters for query operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

impl EventState {
    const fn new() -> Self {
        Self {
            ops: EventOps::new(),
            entities: BTreeMap::new(),
        }
    }

    pub(crate) fn entity(&mut self, name: &str) -> &mut EntityCounters {
        self.entities.entry(name.to_string()).or_default()
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Query lifecycle
    pub queries_compiled: u64,

    // Executor entrypoints
    pub find_calls: u64,
    pub id_calls: u64,
    pub aggregate_calls: u64,
    pub remove_calls: u64,

    // Rows touched
    pub rows_loaded: u64,
    pub rows_removed: u64,

    // Transactions
    pub tx_retries: u64,
    pub tx_retries_exhausted: u64,

    // Reactive
    pub publishes: u64,
    pub deliveries: u64,
}

impl EventOps {
    const fn new() -> Self {
        Self {
            queries_compiled: 0,
            find_calls: 0,
            id_calls: 0,
            aggregate_calls: 0,
            remove_calls: 0,
            rows_loaded: 0,
            rows_removed: 0,
            tx_retries: 0,
            tx_retries_exhausted: 0,
            publishes: 0,
            deliveries: 0,
        }
    }
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub find_calls: u64,
    pub aggregate_calls: u64,
    pub remove_calls: u64,
    pub rows_loaded: u64,
    pub rows_removed: u64,
    pub publishes: u64,
}

///
/// EventReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventOps,
    pub entity_counters: BTreeMap<String, EntityCounters>,
}

static EVENT_STATE: Mutex<EventState> = Mutex::new(EventState::new());

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock())
}

pub(crate) fn report() -> EventReport {
    let state = EVENT_STATE.lock();

    EventReport {
        counters: state.ops.clone(),
        entity_counters: state.entities.clone(),
    }
}

/// Reset all counters.
pub(crate) fn reset_all() {
    *EVENT_STATE.lock() = EventState::new();
}

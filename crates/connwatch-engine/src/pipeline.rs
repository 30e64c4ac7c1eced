use std::collections::BTreeMap;

use connwatch_types::{Connection, SnapshotMessage, TrafficTotals};
use tracing::debug;

use crate::aggregate::speed_by_chain;
use crate::capacity::Capacity;
use crate::diff::closed;
use crate::ledger::{CollisionPolicy, Ledger};
use crate::prefs::ViewPrefs;
use crate::speed::annotate;
use crate::view::{ViewOptions, materialize};
use crate::{DEFAULT_LOAD_MORE_STEP, DEFAULT_MAX_CLOSED_ROWS, DEFAULT_VISIBLE_ROWS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_closed_rows: usize,
    pub initial_rows: usize,
    pub load_more_step: usize,
    pub collision: CollisionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_closed_rows: DEFAULT_MAX_CLOSED_ROWS,
            initial_rows: DEFAULT_VISIBLE_ROWS,
            load_more_step: DEFAULT_LOAD_MORE_STEP,
            collision: CollisionPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Null message or no `connections`; views untouched.
    Skipped,
    /// Paused: ledger advanced, views untouched.
    Frozen { ledger_len: usize },
    Materialized {
        active: usize,
        closed: usize,
        ledger_len: usize,
    },
}

/// All state derived from one snapshot subscription.
///
/// Feed it one message at a time with [`Pipeline::ingest`]; drop everything
/// with [`Pipeline::reset`] when the subscription ends.
#[derive(Debug)]
pub struct Pipeline {
    config: EngineConfig,
    ledger: Ledger,
    /// Full annotated active set of the previous tick, used for speed deltas.
    previous_active: Vec<Connection>,
    active_view: Vec<Connection>,
    closed_view: Vec<Connection>,
    chain_speeds: BTreeMap<String, i64>,
    totals: TrafficTotals,
    paused: bool,
    capacity: Capacity,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ledger: Ledger::new(config.collision),
            previous_active: Vec::new(),
            active_view: Vec::new(),
            closed_view: Vec::new(),
            chain_speeds: BTreeMap::new(),
            totals: TrafficTotals::default(),
            paused: false,
            capacity: Capacity::new(config.initial_rows, config.load_more_step),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ingest(&mut self, message: Option<SnapshotMessage>, prefs: &ViewPrefs) -> TickOutcome {
        let Some(message) = message else {
            return TickOutcome::Skipped;
        };
        self.totals = message.totals();
        let Some(snapshot) = message.connections else {
            return TickOutcome::Skipped;
        };

        let active = annotate(snapshot, &self.previous_active);
        let closed_conns = closed(&active, self.ledger.as_slice());
        self.ledger.merge(&active);
        let evicted = self.ledger.truncate(&active, self.config.max_closed_rows);
        debug!(
            active = active.len(),
            closed = closed_conns.len(),
            ledger = self.ledger.len(),
            evicted,
            "snapshot folded into ledger"
        );

        if self.paused {
            self.previous_active = active;
            return TickOutcome::Frozen {
                ledger_len: self.ledger.len(),
            };
        }

        let options = ViewOptions {
            filter: prefs.filter.clone(),
            sort: prefs.sort,
            visible_rows: self.capacity.rows(),
            max_closed_rows: self.config.max_closed_rows,
        };
        let (active_view, closed_view) = materialize(&active, closed_conns, &options);
        self.chain_speeds = speed_by_chain(&active);
        self.active_view = active_view;
        self.closed_view = closed_view;
        self.previous_active = active;

        TickOutcome::Materialized {
            active: self.active_view.len(),
            closed: self.closed_view.len(),
            ledger_len: self.ledger.len(),
        }
    }

    /// Drops the ledger, views and speed history; returns the ledger size before clearing.
    pub fn reset(&mut self) -> usize {
        let cleared = self.ledger.clear();
        self.previous_active.clear();
        self.active_view.clear();
        self.closed_view.clear();
        self.chain_speeds.clear();
        self.totals = TrafficTotals::default();
        self.paused = false;
        self.capacity.reset();
        cleared
    }

    /// Returns whether the flag changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        let changed = self.paused != paused;
        self.paused = paused;
        changed
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Takes effect on the next materialized tick.
    pub fn grow_capacity(&mut self) -> usize {
        self.capacity.grow()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.rows()
    }

    pub fn active_view(&self) -> &[Connection] {
        &self.active_view
    }

    pub fn closed_view(&self) -> &[Connection] {
        &self.closed_view
    }

    pub fn chain_speeds(&self) -> &BTreeMap<String, i64> {
        &self.chain_speeds
    }

    pub fn totals(&self) -> TrafficTotals {
        self.totals
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

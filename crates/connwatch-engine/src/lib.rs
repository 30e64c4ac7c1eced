//! Turns a stream of full connection snapshots into speed-annotated active
//! and closed views with bounded memory.
//!
//! Each tick runs, in order: [`speed::annotate`], [`diff::closed`] against the
//! ledger as it stood before the tick, [`ledger::Ledger::merge`] and
//! [`ledger::Ledger::truncate`], then [`view::materialize`] and
//! [`aggregate::speed_by_chain`] unless the pipeline is paused.

pub mod aggregate;
pub mod capacity;
pub mod diff;
pub mod ledger;
pub mod pipeline;
pub mod prefs;
pub mod speed;
pub mod view;

pub use capacity::Capacity;
pub use ledger::{CollisionPolicy, Ledger};
pub use pipeline::{EngineConfig, Pipeline, TickOutcome};
pub use prefs::{MemoryPreferences, PreferenceStore, ViewPrefs};
pub use view::ViewOptions;

/// Closed rows kept for display, and the closed-history share of the ledger window.
pub const DEFAULT_MAX_CLOSED_ROWS: usize = 500;
pub const DEFAULT_VISIBLE_ROWS: usize = 30;
/// Rows added to the view capacity per "load more" request.
pub const DEFAULT_LOAD_MORE_STEP: usize = 10;

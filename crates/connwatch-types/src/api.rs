use facet::Facet;

use crate::{Connection, SortSpec, SortingEntry, TrafficTotals};

/// API response for `/api/connections/active` and `/api/connections/closed`.
#[derive(Facet)]
pub struct ConnectionsResponse {
    pub count: usize,
    pub connections: Vec<Connection>,
}

#[derive(Facet, Clone, Debug, PartialEq, Eq)]
pub struct ChainSpeed {
    pub chain: String,
    pub download_speed: i64,
}

/// API response for `/api/chains/speed`, ordered by chain label.
#[derive(Facet)]
pub struct ChainSpeedsResponse {
    pub chains: Vec<ChainSpeed>,
}

#[derive(Facet)]
pub struct PausedRequest {
    pub paused: bool,
}

#[derive(Facet)]
pub struct PausedResponse {
    pub paused: bool,
}

#[derive(Facet)]
pub struct CapacityResponse {
    pub visible_rows: usize,
}

#[derive(Facet)]
pub struct ResetResponse {
    pub cleared_ledger_entries: usize,
}

#[derive(Facet)]
pub struct FilterPreferenceRequest {
    #[facet(default)]
    pub text: Option<String>,
}

#[derive(Facet)]
pub struct PreferencesResponse {
    #[facet(skip_unless_truthy)]
    pub quick_filter: Option<String>,
    #[facet(skip_unless_truthy)]
    pub sorting: Option<SortSpec>,
}

/// Body of `PUT /api/preferences/sorting`; `null` clears the sort.
pub type SortingPreferenceRequest = Option<SortingEntry>;

/// Document pushed over `/api/views/ws` whenever the views change.
#[derive(Facet, Clone, Debug)]
pub struct ViewsUpdate {
    pub active: Vec<Connection>,
    pub closed: Vec<Connection>,
    pub chains: Vec<ChainSpeed>,
    pub paused: bool,
    pub totals: TrafficTotals,
}

#[derive(Facet)]
pub struct ApiError {
    pub error: String,
}

/// API response for `/api/feed`: the snapshot producer currently attached.
#[derive(Facet)]
pub struct FeedStatusResponse {
    pub connected: bool,
    #[facet(skip_unless_truthy)]
    pub peer: Option<String>,
    pub frames_received: u64,
    pub frames_rejected: u64,
}

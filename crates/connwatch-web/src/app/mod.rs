use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use connwatch_engine::PreferenceStore;
use tokio::sync::Mutex;

use crate::api::control::{api_capacity_more, api_feed_status, api_get_paused, api_reset, api_set_paused};
use crate::api::preferences::{api_get_preferences, api_put_filter, api_put_sorting};
use crate::api::views::{
    api_active_connections, api_chain_speeds, api_closed_connections, api_traffic, api_views_ws,
};
use crate::pipeline::PipelineHandle;

pub mod ids;
pub use ids::FeedId;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
    pub prefs: Arc<dyn PreferenceStore>,
    pub feed: Arc<Mutex<FeedSlot>>,
}

/// The one snapshot producer allowed at a time.
pub struct FeedSlot {
    pub next_feed_id: FeedId,
    pub active: Option<ActiveFeed>,
}

pub struct ActiveFeed {
    pub id: FeedId,
    pub peer: SocketAddr,
    pub frames_received: u64,
    pub frames_rejected: u64,
}

impl FeedSlot {
    pub fn new() -> Self {
        Self {
            next_feed_id: FeedId::ONE,
            active: None,
        }
    }

    /// Claims the slot for `peer`, or returns the feed already holding it.
    pub fn claim(&mut self, peer: SocketAddr) -> Result<FeedId, (FeedId, SocketAddr)> {
        if let Some(active) = &self.active {
            return Err((active.id, active.peer));
        }
        let id = self.next_feed_id;
        self.next_feed_id = id.next();
        self.active = Some(ActiveFeed {
            id,
            peer,
            frames_received: 0,
            frames_rejected: 0,
        });
        Ok(id)
    }

    /// Frees the slot if `id` still holds it.
    pub fn release(&mut self, id: FeedId) -> bool {
        if self.active.as_ref().is_some_and(|feed| feed.id == id) {
            self.active = None;
            return true;
        }
        false
    }

    pub fn record_frame(&mut self, id: FeedId, accepted: bool) {
        if let Some(feed) = self.active.as_mut().filter(|feed| feed.id == id) {
            if accepted {
                feed.frames_received += 1;
            } else {
                feed.frames_rejected += 1;
            }
        }
    }
}

impl Default for FeedSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new(pipeline: PipelineHandle, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            pipeline,
            prefs,
            feed: Arc::new(Mutex::new(FeedSlot::new())),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/connections/active", get(api_active_connections))
        .route("/api/connections/closed", get(api_closed_connections))
        .route("/api/chains/speed", get(api_chain_speeds))
        .route("/api/traffic", get(api_traffic))
        .route("/api/paused", get(api_get_paused).post(api_set_paused))
        .route("/api/capacity/more", post(api_capacity_more))
        .route("/api/reset", post(api_reset))
        .route("/api/feed", get(api_feed_status))
        .route("/api/preferences", get(api_get_preferences))
        .route("/api/preferences/filter", put(api_put_filter))
        .route("/api/preferences/sorting", put(api_put_sorting))
        .route("/api/views/ws", get(api_views_ws))
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

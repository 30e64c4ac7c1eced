use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use connwatch_types::{
    CapacityResponse, FeedStatusResponse, PausedRequest, PausedResponse, ResetResponse,
};

use crate::app::AppState;
use crate::util::http::{json_error, json_ok, parse_json_body};

pub async fn api_get_paused(State(state): State<AppState>) -> impl IntoResponse {
    let paused = *state.pipeline.views().paused.borrow();
    json_ok(&PausedResponse { paused })
}

pub async fn api_set_paused(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req: PausedRequest = match parse_json_body(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    match state.pipeline.set_paused(req.paused).await {
        Ok(paused) => json_ok(&PausedResponse { paused }),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

pub async fn api_capacity_more(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.grow_capacity().await {
        Ok(visible_rows) => json_ok(&CapacityResponse { visible_rows }),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

pub async fn api_reset(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.reset("api request").await {
        Ok(cleared_ledger_entries) => json_ok(&ResetResponse {
            cleared_ledger_entries,
        }),
        Err(e) => json_error(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

pub async fn api_feed_status(State(state): State<AppState>) -> impl IntoResponse {
    let guard = state.feed.lock().await;
    let response = match &guard.active {
        Some(feed) => FeedStatusResponse {
            connected: true,
            peer: Some(feed.peer.to_string()),
            frames_received: feed.frames_received,
            frames_rejected: feed.frames_rejected,
        },
        None => FeedStatusResponse {
            connected: false,
            peer: None,
            frames_received: 0,
            frames_rejected: 0,
        },
    };
    json_ok(&response)
}

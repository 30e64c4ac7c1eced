use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use connwatch_engine::ViewPrefs;
use connwatch_engine::prefs::{QUICK_FILTER_KEY, SORTING_KEY};
use connwatch_types::{FilterPreferenceRequest, PreferencesResponse, SortingPreferenceRequest};
use tracing::info;

use crate::app::AppState;
use crate::util::http::{json_error, json_ok, parse_json_body};

fn preferences_response(state: &AppState) -> Response {
    let prefs = ViewPrefs::load(state.prefs.as_ref());
    json_ok(&PreferencesResponse {
        quick_filter: prefs.filter,
        sorting: prefs.sort,
    })
}

pub async fn api_get_preferences(State(state): State<AppState>) -> impl IntoResponse {
    preferences_response(&state)
}

/// Takes effect on the next snapshot tick.
pub async fn api_put_filter(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req: FilterPreferenceRequest = match parse_json_body(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    match req.text.filter(|text| !text.is_empty()) {
        Some(text) => {
            info!(filter = %text, "quick filter set");
            state.prefs.set(QUICK_FILTER_KEY, text);
        }
        None => {
            info!("quick filter cleared");
            state.prefs.remove(QUICK_FILTER_KEY);
        }
    }
    preferences_response(&state)
}

/// Takes effect on the next snapshot tick. Unknown column ids are refused
/// here rather than stored and silently ignored.
pub async fn api_put_sorting(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req: SortingPreferenceRequest = match parse_json_body(&body) {
        Ok(req) => req,
        Err(response) => return response,
    };
    match req {
        Some(entry) => {
            if entry.to_spec().is_none() {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    format!("unknown sort column: {}", entry.id),
                );
            }
            let stored = match facet_json::to_string(&vec![entry]) {
                Ok(stored) => stored,
                Err(e) => {
                    return json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("encode sorting preference: {e}"),
                    );
                }
            };
            info!(sorting = %stored, "sorting set");
            state.prefs.set(SORTING_KEY, stored);
        }
        None => {
            info!("sorting cleared");
            state.prefs.remove(SORTING_KEY);
        }
    }
    preferences_response(&state)
}

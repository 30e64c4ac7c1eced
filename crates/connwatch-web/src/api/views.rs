use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use connwatch_engine::aggregate::chain_speed_rows;
use connwatch_types::{ChainSpeedsResponse, ConnectionsResponse};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::util::http::json_ok;

pub async fn api_active_connections(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.pipeline.views().active.borrow().as_ref().clone();
    json_ok(&ConnectionsResponse {
        count: connections.len(),
        connections,
    })
}

pub async fn api_closed_connections(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.pipeline.views().closed.borrow().as_ref().clone();
    json_ok(&ConnectionsResponse {
        count: connections.len(),
        connections,
    })
}

pub async fn api_chain_speeds(State(state): State<AppState>) -> impl IntoResponse {
    let chains = chain_speed_rows(&state.pipeline.views().chains.borrow());
    json_ok(&ChainSpeedsResponse { chains })
}

pub async fn api_traffic(State(state): State<AppState>) -> impl IntoResponse {
    let totals = *state.pipeline.views().totals.borrow();
    json_ok(&totals)
}

pub async fn api_views_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| views_ws_task(state, socket))
}

async fn views_ws_task(state: AppState, mut socket: WebSocket) {
    let mut views = state.pipeline.views().clone();
    debug!("views stream opened");
    loop {
        let update = views.current_marking_seen();
        let payload = match facet_json::to_string(&update) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%e, "failed to encode views update");
                break;
            }
        };
        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("views stream closed");
}

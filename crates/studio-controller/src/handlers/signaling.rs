//! `GET /ws` - upgrade to the signaling WebSocket.

use crate::routes::AppState;
use crate::signaling::connection::run_connection;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use std::sync::Arc;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let broker = Arc::clone(&state.broker);
    let outbound_buffer = state.config.outbound_buffer;
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| run_connection(socket, broker, outbound_buffer, shutdown))
}

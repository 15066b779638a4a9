// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebSocket transport for realtime events.
//!
//! Protocol is one-way: the server pushes serialized `RealtimeEvent`s as
//! text frames. Any inbound frame counts as a heartbeat for presence.

use crate::middleware::AuthUser;
use crate::services::ChannelConnection;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.user_id))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let (connection, mut outbound) = ChannelConnection::new();
    let connection_id = state.bus.register_connection(&user_id, Arc::new(connection));

    loop {
        tokio::select! {
            event = outbound.recv() => {
                // None: replaced by a newer connection for the same user
                let Some(payload) = event else { break };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => state.bus.heartbeat(&user_id),
            },
        }
    }

    state.bus.release_connection(&user_id, &connection_id);
    tracing::info!(user_id = %user_id, connection_id = %connection_id, "WebSocket closed");
}

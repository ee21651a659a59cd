//! WebSocket handler: host commands in, viewer events out

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use campus_core::{CommandReply, HostCommand};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Replies to messages from the client
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsReply {
    #[serde(rename = "command_result")]
    CommandResult(CommandReply),
    #[serde(rename = "command_error")]
    CommandError { message: String },
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe().await;

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            // Forward viewer events to the client
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Viewer event channel lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Handle incoming messages from the client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text(&state, text.as_str()).await;
                        if let Ok(json) = serde_json::to_string(&reply) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

async fn handle_text(state: &AppState, text: &str) -> WsReply {
    // Keepalive
    if text == "ping" {
        return WsReply::Pong;
    }

    match HostCommand::parse(text) {
        Ok(command) => {
            let kind = command.kind();
            let ok = state.viewer.lock().await.dispatch(command).await;
            WsReply::CommandResult(CommandReply {
                command: kind.to_string(),
                ok,
            })
        }
        Err(e) => {
            warn!(error = %e, "Ignoring host message");
            WsReply::CommandError {
                message: e.to_string(),
            }
        }
    }
}

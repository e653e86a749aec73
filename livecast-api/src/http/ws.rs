//! Subscriber WebSocket handler.
//!
//! One socket per subscriber. Outbound messages flow through an unbounded
//! channel drained by a writer task; the read loop feeds watch requests to
//! the relay controller and everything is cleaned up on transport close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use livecast_core::event::OutboundMessage;
use livecast_core::models::{ConnectionId, StreamerId};

use crate::http::AppState;
use crate::protocol::ClientMessage;

/// WebSocket handler for subscriber connections
pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    info!(connection_id = %connection_id, "Subscriber connected");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Channel for relayed messages; the hub holds the sender while the
    // subscriber is associated.
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();

    // Writer task: drains relayed messages to the socket until every sender
    // (ours and the hub's) is gone.
    let writer_id = connection_id.clone();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(err) => {
                    error!(
                        connection_id = %writer_id,
                        error = %err,
                        "Failed to serialize outbound message"
                    );
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text.into())).await.is_err() {
                debug!(connection_id = %writer_id, "Subscriber send failed, stopping writer");
                break;
            }
        }
    });

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let Some(message) = ClientMessage::parse(text.as_str()) else {
                    continue;
                };
                match message {
                    ClientMessage::ConnectStreamer { username } => {
                        let streamer = StreamerId::from_string(username);
                        if let Err(err) = state
                            .controller
                            .watch(&connection_id, streamer, tx.clone())
                            .await
                        {
                            warn!(
                                connection_id = %connection_id,
                                error = %err,
                                "Watch request rejected"
                            );
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Binary, ping and pong frames are ignored
            }
            Err(err) => {
                debug!(connection_id = %connection_id, error = %err, "Subscriber socket error");
                break;
            }
        }
    }

    state.controller.disconnect(&connection_id).await;
    info!(connection_id = %connection_id, "Subscriber disconnected");
}

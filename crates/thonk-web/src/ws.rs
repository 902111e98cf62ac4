//! WebSocket upgrade handler and message dispatch.
//!
//! Each connected client receives:
//! 1. A full [`ChannelSnapshot`] on connect.
//! 2. Incremental [`WsMessage`] updates as the channel changes.
//!
//! Clients may also chat over the socket with
//! `{"type":"chat","user_id":"..","name":"..","content":".."}`.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::{AppState, PostMessage, submit};
use crate::broadcast::WsMessage;
use crate::snapshot::ChannelSnapshot;

/// GET /ws: WebSocket upgrade handler.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, app: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before the snapshot so nothing falls between the two.
    let mut broadcast_rx = app.channel.subscribe();

    let snapshot = WsMessage::Snapshot {
        data: ChannelSnapshot::from_channel(&app.channel).to_json(),
    };
    if ws_send(&mut sink, &snapshot).await.is_err() {
        return;
    }

    debug!("WebSocket client connected");

    let channel = app.channel.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged by {n} messages, resending snapshot");
                    let msg = WsMessage::Snapshot {
                        data: ChannelSnapshot::from_channel(&channel).to_json(),
                    };
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&text, &app),
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!("WebSocket client disconnected");
    forward_task.abort();
}

/// Process a JSON message received from a client.
fn handle_client_message(text: &str, app: &AppState) {
    #[derive(serde::Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum ClientMessage {
        Chat {
            user_id: String,
            name: String,
            content: String,
        },
    }

    let Ok(ClientMessage::Chat {
        user_id,
        name,
        content,
    }) = serde_json::from_str::<ClientMessage>(text)
    else {
        debug!("Ignoring malformed WebSocket message");
        return;
    };

    let body = PostMessage {
        user_id,
        name,
        content,
    };
    if submit(&app.channel, &app.inbound_tx, body).is_err() {
        warn!("Relay is not accepting messages; dropped WebSocket chat");
    }
}

/// Serialize a `WsMessage` and send it over the WebSocket sink.
async fn ws_send(sink: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

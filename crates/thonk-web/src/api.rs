//! REST API endpoint handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use thonk::surface::{Author, InboundMessage};
use tokio::sync::mpsc;

use crate::channel::WebChannel;
use crate::snapshot::{ChannelSnapshot, PresenceSnapshot};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub channel: WebChannel,
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

/// GET /api/channel: Full channel snapshot.
pub async fn get_channel(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(ChannelSnapshot::from_channel(&app.channel).to_json())
}

/// GET /api/presence: The relay's current status.
pub async fn get_presence(State(app): State<AppState>) -> Json<PresenceSnapshot> {
    Json(PresenceSnapshot::from_channel(&app.channel))
}

/// A chat message written in the browser.
#[derive(Deserialize)]
pub struct PostMessage {
    pub user_id: String,
    pub name: String,
    pub content: String,
}

/// POST /api/messages: Say something in the channel.
///
/// The message shows up in the channel right away and is queued for the
/// relay. Returns 202 once queued, 503 if the relay is not consuming.
pub async fn post_message(
    State(app): State<AppState>,
    Json(body): Json<PostMessage>,
) -> StatusCode {
    match submit(&app.channel, &app.inbound_tx, body) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(()) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Record a browser message in the channel and hand it to the relay.
pub(crate) fn submit(
    channel: &WebChannel,
    inbound_tx: &mpsc::Sender<InboundMessage>,
    body: PostMessage,
) -> Result<(), ()> {
    let author = Author::new(body.user_id, body.name);
    channel.record_user(&author, &body.content);
    let members = channel.members_except(&author.name);
    let message = InboundMessage::new(author, body.content).with_members(members);
    inbound_tx.try_send(message).map_err(|_| ())
}

//! Browser-facing chat surface for the thonk relay.
//!
//! `thonk-web` runs an axum server that plays the part of a chat channel:
//! browsers post messages over REST or WebSocket, the relay answers through
//! a [`WebChannel`], and every post, deletion and presence change is pushed
//! to all connected WebSocket clients.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use thonk::prelude::*;
//! use thonk_web::{WebChannel, WebConfig, spawn_web};
//!
//! let channel = WebChannel::new(256, 500);
//! let (addr, mut inbound) = spawn_web(channel.clone(), WebConfig::default()).await?;
//! println!("Web UI: http://{addr}");
//!
//! let relay = Arc::new(Relay::new(config, backend, Arc::new(channel.clone())));
//! while let Some(message) = inbound.recv().await {
//!     let (relay, channel) = (relay.clone(), channel.clone());
//!     tokio::spawn(async move { relay.handle_message(message, Arc::new(channel)).await });
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! browser ──POST /api/messages, {"type":"chat"}──▶ mpsc ──▶ Relay
//!    ▲                                                        │
//!    └──── /ws ◀── WsMessage ◀── WebChannel (Channel + Presence)◀┘
//! ```

mod api;
pub mod broadcast;
pub mod channel;
mod server;
pub mod snapshot;
mod ws;

pub use broadcast::WsMessage;
pub use channel::{ChannelEntry, WebChannel};
pub use snapshot::{ChannelSnapshot, PresenceSnapshot};

use std::net::SocketAddr;
use std::path::PathBuf;

use thonk::surface::InboundMessage;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory of static frontend files. `None` serves only API and WS.
    pub static_dir: Option<PathBuf>,
    /// Inbound messages buffered before `POST /api/messages` answers 503.
    /// Default: 32.
    pub inbound_capacity: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
            inbound_capacity: 32,
        }
    }
}

/// Spawn the web server on a Tokio task.
///
/// Returns the bound address and a receiver for chat messages sent from
/// browsers. Feed each one to
/// [`Relay::handle_message`](thonk::surface::Relay::handle_message) with the
/// same `channel`.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(
    channel: WebChannel,
    config: WebConfig,
) -> Result<(SocketAddr, tokio::sync::mpsc::Receiver<InboundMessage>), String> {
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(config.inbound_capacity.max(1));
    let router = server::build_router(channel, inbound_tx, config.static_dir);
    let addr = server::start_server(router, config.bind_addr).await?;
    Ok((addr, inbound_rx))
}

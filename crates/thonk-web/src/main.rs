//! Browser chat surface for the thonk relay.
//!
//! # Usage
//!
//! ```bash
//! THONK_API_URL=http://gpu-box:42069/api/generate cargo run -p thonk-web
//! cargo run -p thonk-web -- --port 8080 --paced
//! ```
//!
//! ## Sending messages
//!
//! **WebSocket** (connect to `/ws`):
//! ```json
//! {"type": "chat", "user_id": "42", "name": "ada", "content": "!ai why is the sky blue?"}
//! ```
//!
//! **REST** (`POST /api/messages`):
//! ```json
//! {"user_id": "42", "name": "ada", "content": "!config llama3 0.2"}
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thonk::prelude::*;
use thonk::surface::flavor::presence_activity;
use thonk_web::{WebChannel, WebConfig, spawn_web};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Browser chat surface for the thonk relay.
#[derive(Parser)]
#[command(about = "Serve a browser chat channel backed by the thonk relay")]
struct Args {
    /// Port for the web server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Directory of static frontend files to serve.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Messages kept in the channel history.
    #[arg(long, default_value_t = 500)]
    history: usize,

    /// Generate endpoint. Overrides THONK_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Default model. Overrides THONK_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Total backend budget in seconds. Overrides THONK_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Send raw 2000-char messages with a pause instead of framed parts.
    #[arg(long)]
    paced: bool,

    /// Name the relay uses for itself. Overrides THONK_BOT_NAME.
    #[arg(long)]
    bot_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 1. Relay configuration: env first, flags on top.
    let mut config = RelayConfig::from_env();
    if let Some(url) = args.api_url {
        config = config.with_api_url(url);
    }
    if let Some(model) = args.model {
        config = config.with_default_model(model);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_total_timeout(Duration::from_secs(secs));
    }
    if args.paced {
        config = config.with_delivery(DeliveryMode::Paced);
    }
    if let Some(name) = args.bot_name {
        config = config.with_bot_name(name);
    }
    let backend = OllamaClient::new(&config)?;
    info!("Relaying to {} (default model '{}')", backend.url(), config.default_model);

    // 2. The channel doubles as the presence indicator.
    let channel = WebChannel::new(256, args.history);
    let activity = presence_activity(PresenceStatus::Available, &mut rand::thread_rng());
    channel.set_status(PresenceStatus::Available, activity).await?;

    // 3. Spawn the web server.
    let web_config = WebConfig {
        bind_addr: ([127, 0, 0, 1], args.port).into(),
        static_dir: args.static_dir,
        ..Default::default()
    };
    let (addr, mut inbound) = spawn_web(channel.clone(), web_config).await?;
    println!("Web UI: http://{addr}");

    // 4. One task per message; the relay's gate serializes backend calls.
    let relay = Arc::new(
        Relay::new(config, Arc::new(backend), Arc::new(channel.clone()))
            .with_events(Arc::new(LoggingHandler)),
    );
    while let Some(message) = inbound.recv().await {
        let relay = relay.clone();
        let channel: Arc<dyn Channel> = Arc::new(channel.clone());
        tokio::spawn(async move {
            relay.handle_message(message, channel).await;
        });
    }

    Ok(())
}

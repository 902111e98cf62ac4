//! Terminal surface for the thonk relay.
//!
//! Reads chat lines from stdin as a single user and prints everything the
//! relay posts. Backend settings come from `THONK_*` environment variables
//! and can be overridden with flags.
//!
//! ```sh
//! THONK_API_URL=http://gpu-box:42069/api/generate thonk --user-name ada
//! > !config hf.co/unsloth/DeepSeek-R1-Distill-Qwen-7B-GGUF:Q8_0 0.6
//! > !ai why is the sky blue?
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use thonk::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Single-flight prompt relay, terminal edition.
#[derive(Parser)]
#[command(name = "thonk")]
struct Cli {
    /// Stable identifier for the local user (keys rate limits and settings).
    #[arg(long, default_value = "local")]
    user_id: String,

    /// Display name for the local user.
    #[arg(long, default_value = "you")]
    user_name: String,

    /// Other channel members, used in progress flavor text.
    #[arg(long, value_delimiter = ',')]
    members: Vec<String>,

    /// Generate endpoint. Overrides THONK_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Default model. Overrides THONK_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Default sampling temperature. Overrides THONK_TEMPERATURE.
    #[arg(long)]
    temperature: Option<f32>,

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

impl Cli {
    fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::from_env();
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url);
        }
        if let Some(model) = &self.model {
            config = config.with_default_model(model);
        }
        if let Some(t) = self.temperature {
            config = config.with_temperature(t);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_total_timeout(Duration::from_secs(secs));
        }
        if self.paced {
            config = config.with_delivery(DeliveryMode::Paced);
        }
        if let Some(name) = &self.bot_name {
            config = config.with_bot_name(name);
        }
        config
    }
}

/// Prints posted messages to stdout.
#[derive(Default)]
struct StdoutChannel {
    next_id: AtomicU64,
}

impl Channel for StdoutChannel {
    fn send(&self, message: OutboundMessage) -> SurfaceFuture<'_, MessageId> {
        Box::pin(async move {
            let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            match &message.body {
                OutboundBody::Text { content } => println!("{content}\n"),
                OutboundBody::Embed {
                    title,
                    description,
                    image_url,
                } => {
                    println!("┃ {title}");
                    if let Some(d) = description {
                        for line in d.lines() {
                            println!("┃ {line}");
                        }
                    }
                    if let Some(url) = image_url {
                        println!("┃ <{url}>");
                    }
                    println!();
                }
            }
            Ok(id)
        })
    }

    fn delete(&self, id: MessageId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            debug!("Message #{} removed", id.0);
            Ok(())
        })
    }
}

/// Reports presence changes in the log.
struct LogPresence;

impl Presence for LogPresence {
    fn set_status(&self, status: PresenceStatus, activity: &str) -> SurfaceFuture<'_, ()> {
        let activity = activity.to_string();
        Box::pin(async move {
            info!("Presence: {status:?} ({activity})");
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config();
    let backend = match OllamaClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    info!(
        "Relaying to {} as '{}' (default model '{}')",
        backend.url(),
        config.bot_name,
        config.default_model
    );

    let relay = Arc::new(
        Relay::new(config, Arc::new(backend), Arc::new(LogPresence))
            .with_events(Arc::new(LoggingHandler)),
    );
    let channel: Arc<dyn Channel> = Arc::new(StdoutChannel::default());
    let author = Author::new(cli.user_id.as_str(), cli.user_name.as_str());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inflight = Vec::new();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: failed to read stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let message = InboundMessage::new(author.clone(), line).with_members(cli.members.clone());
        let relay = relay.clone();
        let channel = channel.clone();
        inflight.retain(|task: &tokio::task::JoinHandle<()>| !task.is_finished());
        inflight.push(tokio::spawn(async move {
            relay.handle_message(message, channel).await;
        }));
    }

    // Let outstanding requests finish before exiting on EOF.
    for task in inflight {
        let _ = task.await;
    }
}

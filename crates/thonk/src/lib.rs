//! Single-flight prompt relay between a chat surface and a slow generation backend.
//!
//! `thonk` takes prompts typed into a chat channel, forwards them to an
//! Ollama-style `/api/generate` endpoint, and posts the (often very long)
//! answer back in pieces small enough for the channel. The backend serves one
//! request at a time and may take many minutes, so the relay is built around
//! four guarantees:
//!
//! - **Single flight.** At most one backend call is outstanding process-wide.
//!   Anyone who asks while it runs is told to wait; nothing is queued.
//! - **Fair use.** Each user gets a fixed number of admitted requests for the
//!   lifetime of the process.
//! - **Liveness feedback.** While the call is outstanding a heartbeat posts
//!   progress notices at a growing interval, and stops the moment the call
//!   settles.
//! - **Bounded delivery.** Responses are normalized, split into ordered parts
//!   and framed as question/answer messages.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use thonk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = RelayConfig::from_env();
//!     let backend = OllamaClient::new(&config)?;
//!     let relay = Relay::new(config, Arc::new(backend), Arc::new(NoPresence));
//!
//!     let channel: Arc<dyn Channel> = Arc::new(RecordingChannel::new());
//!     let message = InboundMessage::new(Author::new("42", "ada"), "!ai why is the sky blue?");
//!     relay.handle_message(message, channel).await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`admission`] | [`RequestGate`](admission::RequestGate) single-flight slot and the per-user [`RateLimiter`](admission::RateLimiter) |
//! | [`context`] | [`ContextStore`](context::ContextStore), bounded per-user history |
//! | [`delivery`] | Chunking, answer framing, paced plain-text delivery |
//! | [`pipeline`] | [`Orchestrator`](pipeline::Orchestrator), heartbeat, normalization, events |
//! | [`surface`] | Chat-surface collaborator traits, command parsing, the [`Relay`](surface::Relay) dispatcher |
//! | [`config`] | [`RelayConfig`](config::RelayConfig) and per-user settings |
//! | [`error`] | Rejection and backend error taxonomy |

pub mod admission;
pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod surface;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, trace};

use crate::config::RelayConfig;
use crate::error::BackendError;

// ── Constants ──────────────────────────────────────────────────────

/// Default generation endpoint (a local Ollama instance).
pub const DEFAULT_API_URL: &str = "http://localhost:42069/api/generate";

/// Models the relay is usually pointed at.
pub const KNOWN_MODELS: &[&str] = &[
    "hf.co/unsloth/DeepSeek-R1-Distill-Qwen-7B-GGUF:Q8_0",
    "hf.co/unsloth/DeepSeek-R1-Distill-Qwen-7B-GGUF:Q4_K_M",
];

/// Model used when a user has not configured one.
pub const DEFAULT_MODEL: &str = KNOWN_MODELS[1];

/// Sampling temperature used when a user has not configured one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// ── Request / response types ───────────────────────────────────────

/// Body of a non-streaming generate call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub stream: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            stream: false,
        }
    }
}

/// Pull the generated text out of a backend reply.
///
/// Returns `None` when the `response` field is missing or not a string.
pub fn response_text(reply: &serde_json::Value) -> Option<&str> {
    reply.get("response").and_then(|v| v.as_str())
}

// ── Backend seam ───────────────────────────────────────────────────

/// Boxed future returned by [`Backend::generate`].
pub type BackendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<serde_json::Value, BackendError>> + Send + 'a>>;

/// The one expensive operation the relay guards.
///
/// Implementations return the decoded JSON reply; extracting and validating
/// the `response` field is the caller's job so that a malformed reply is
/// reported the same way regardless of transport.
pub trait Backend: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BackendFuture<'a>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an Ollama-compatible generate endpoint.
pub struct OllamaClient {
    pub(crate) client: reqwest::Client,
    pub(crate) url: String,
    pub(crate) api_key: Option<String>,
}

impl OllamaClient {
    /// Build a client from the relay configuration.
    ///
    /// The connect and read budgets are enforced by the HTTP client; the
    /// total budget is enforced again around the whole call by the
    /// orchestrator so that a timeout there tears down the heartbeat too.
    pub fn new(config: &RelayConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("thonk/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.timeouts.connect)
            .read_timeout(config.timeouts.read)
            .timeout(config.timeouts.total)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// The endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: &GenerateRequest) -> Result<serde_json::Value, BackendError> {
        debug!(
            "Backend request: model={}, prompt={} chars, temp={}",
            body.model,
            body.prompt.chars().count(),
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let mut request = self.client.post(&self.url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(BackendError::from_transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(BackendError::from_transport)?;

        debug!(
            "Backend response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

impl Backend for OllamaClient {
    fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BackendFuture<'a> {
        Box::pin(self.post(request))
    }
}

//! Convenience re-exports for common `thonk` types.
//!
//! ```ignore
//! use thonk::prelude::*;
//! ```
//!
//! Covers what a surface needs to wire up a relay: the backend client,
//! configuration, the collaborator traits and message types, and the event
//! handlers. Pipeline internals (heartbeat, normalizer, chunker) are left
//! out; import those from their modules when needed.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Backend, BackendFuture, GenerateRequest, OllamaClient, response_text};

// ── Configuration and errors ────────────────────────────────────────
pub use crate::config::{DeliveryMode, RelayConfig, SettingsStore, TimeoutConfig, UserSettings};
pub use crate::error::{BackendError, Rejection, RelayError};

// ── Pipeline ────────────────────────────────────────────────────────
pub use crate::pipeline::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler,
    Orchestrator, Outcome, PromptRequest, RelayEvent,
};

// ── Surface ─────────────────────────────────────────────────────────
pub use crate::surface::{
    Author, Channel, InboundMessage, MessageId, NoPresence, OutboundBody, OutboundMessage,
    Presence, PresenceStatus, RecordedPresence, RecordingChannel, Relay, SurfaceFuture, UserId,
};

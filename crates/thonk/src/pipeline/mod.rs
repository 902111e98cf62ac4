//! The request pipeline.
//!
//! - [`orchestrator`]: [`Orchestrator`], admission through delivery for one
//!   prompt.
//! - [`heartbeat`]: cancellable escalating-interval progress notices.
//! - [`normalize`]: ordered, single-occurrence rewrite rules for model
//!   output.
//! - [`events`]: [`RelayEvent`] and the [`EventHandler`] family.
//! - [`clock`]: elapsed-time and timestamp formatting.

pub mod clock;
pub mod events;
pub mod heartbeat;
pub mod normalize;
pub mod orchestrator;

pub use events::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler, RelayEvent,
};
pub use heartbeat::{Heartbeat, HeartbeatHandle, HeartbeatSchedule};
pub use normalize::Normalizer;
pub use orchestrator::{Orchestrator, Outcome, PromptRequest};

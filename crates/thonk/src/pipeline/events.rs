//! Lifecycle events emitted while relaying a prompt.
//!
//! The [`Orchestrator`](super::Orchestrator), the heartbeat and the
//! [`Relay`](crate::surface::Relay) dispatcher report what they do through
//! [`RelayEvent`] variants. Callers implement [`EventHandler`] to observe them
//! for logging, metrics, UI updates or assertions in tests.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget relays |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::UserSettings;
use crate::error::{Rejection, RelayError};
use crate::surface::UserId;

use super::clock::format_elapsed;

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted while handling chat messages.
#[derive(Debug)]
pub enum RelayEvent<'a> {
    /// A prompt was refused at the gate.
    Rejected {
        user: &'a UserId,
        rejection: &'a Rejection,
    },
    /// A prompt took the single-flight slot.
    Admitted { user: &'a UserId, count: u32 },
    /// The backend call is about to be issued.
    CallStarted {
        user: &'a UserId,
        model: &'a str,
        prompt: &'a str,
    },
    /// The heartbeat posted a progress notice.
    HeartbeatNotice {
        /// Time since the heartbeat started.
        elapsed: Duration,
        /// Whether the interval that just ended was capped.
        clamped: bool,
    },
    /// The heartbeat was cancelled after posting `notices` notices.
    HeartbeatCancelled { notices: u32 },
    /// The call failed; the slot is already free again.
    CallFailed { error: &'a RelayError },
    /// The response was normalized and is about to be delivered.
    Normalized { chars: usize },
    /// Every part of the answer was posted.
    Delivered { parts: usize, elapsed: Duration },
    /// A user stored new generation overrides.
    SettingsUpdated {
        user: &'a UserId,
        settings: &'a UserSettings,
    },
    /// A message was seen but not acted on.
    Ignored { reason: &'a str },
    /// A channel or presence operation failed. Never fatal.
    SurfaceError {
        action: &'a str,
        error: &'a str,
    },
}

/// Handler for relay events.
///
/// The default implementation ignores everything.
///
/// # Example
///
/// ```ignore
/// struct CountFailures(AtomicU32);
///
/// impl EventHandler for CountFailures {
///     fn on_event(&self, event: &RelayEvent<'_>) {
///         if let RelayEvent::CallFailed { .. } = event {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &RelayEvent<'_>) {
        let _ = event;
    }
}

/// An event handler that does nothing.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let RelayEvent::Delivered { parts, .. } = event {
///         println!("{parts} part(s) sent");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&RelayEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&RelayEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&RelayEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RelayEvent<'_>) {
        (self.0)(event)
    }
}

/// An event handler that forwards to several inner handlers in order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(metrics_handler);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the chain. Handlers are called in registration order.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Conditionally add a handler to the chain.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &RelayEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Characters of a prompt shown in logs.
const PREVIEW_CHARS: usize = 80;

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

/// An event handler that logs through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &RelayEvent<'_>) {
        match event {
            RelayEvent::Rejected { user, rejection } => {
                info!("Rejected request from {user}: {rejection}");
            }
            RelayEvent::Admitted { user, count } => {
                info!("Admitted request #{count} from {user}");
            }
            RelayEvent::CallStarted {
                user,
                model,
                prompt,
            } => {
                info!(
                    "Calling backend for {user} with '{model}': {:?}",
                    preview(prompt)
                );
            }
            RelayEvent::HeartbeatNotice { elapsed, clamped } => {
                debug!(
                    "Heartbeat notice at {}{}",
                    format_elapsed(*elapsed),
                    if *clamped { " (capped)" } else { "" }
                );
            }
            RelayEvent::HeartbeatCancelled { notices } => {
                debug!("Heartbeat cancelled after {notices} notice(s)");
            }
            RelayEvent::CallFailed { error } => {
                warn!("Backend call failed ({}): {error}", error.kind());
            }
            RelayEvent::Normalized { chars } => {
                debug!("Normalized response: {chars} chars");
            }
            RelayEvent::Delivered { parts, elapsed } => {
                info!(
                    "Delivered {parts} part(s) in {}",
                    format_elapsed(*elapsed)
                );
            }
            RelayEvent::SettingsUpdated { user, settings } => {
                info!(
                    "Settings for {user}: model={}, temperature={}",
                    settings.model, settings.temperature
                );
            }
            RelayEvent::Ignored { reason } => {
                debug!("Ignored message: {reason}");
            }
            RelayEvent::SurfaceError { action, error } => {
                warn!("Surface {action} failed: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn composite_calls_every_handler() {
        let hits = Arc::new(AtomicU32::new(0));
        let (a, b) = (hits.clone(), hits.clone());
        let handler = CompositeEventHandler::new()
            .with(FnEventHandler::new(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            }))
            .with(LoggingHandler)
            .with_if(false, NoopHandler)
            .with(FnEventHandler::new(move |_| {
                b.fetch_add(10, Ordering::SeqCst);
            }));

        handler.on_event(&RelayEvent::Normalized { chars: 3 });
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn preview_truncates_long_prompts() {
        let long = "x".repeat(200);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}

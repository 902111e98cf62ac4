//! Error taxonomy for the relay.
//!
//! Three layers, from the wire up:
//!
//! - [`BackendError`]: what went wrong talking to the generation endpoint.
//! - [`Rejection`]: why a request was refused admission.
//! - [`RelayError`]: the user-visible classification. Every variant maps to
//!   exactly one channel message via [`RelayError::user_message`], and none of
//!   them escapes a single request-handling invocation.

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::clock::format_elapsed;

/// Transport-level failures from a [`Backend`](crate::Backend).
#[derive(Error, Debug)]
pub enum BackendError {
    /// Could not connect, or the connection broke mid-request.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The connect, read or total budget ran out.
    #[error("backend timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("backend HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The body was not valid JSON.
    #[error("malformed backend reply: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Classify a `reqwest` failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Unreachable(err.to_string())
        }
    }
}

/// Why a request was refused at the gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Another backend call is already outstanding, from any user.
    #[error("a request is already in flight")]
    AlreadyBusy,

    /// The user has used up their lifetime allowance.
    #[error("rate limited ({count}/{threshold})")]
    RateLimited {
        /// The user's counter after this attempt was counted.
        count: u32,
        /// Highest count still admitted.
        threshold: u32,
    },
}

impl Rejection {
    /// Message posted to the channel when this rejection happens.
    pub fn user_message(&self) -> &'static str {
        match self {
            Rejection::AlreadyBusy => "Sorry, I'm already processing an AI request. Please wait.",
            Rejection::RateLimited { .. } => {
                "You've exceeded the message limit. Please try again later."
            }
        }
    }
}

/// User-visible failure classes. Recovered at the orchestrator boundary.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("backend timed out after {elapsed:?} (budget {budget:?})")]
    BackendTimeout {
        /// Wall time from call start to the timeout.
        elapsed: Duration,
        /// Configured total budget.
        budget: Duration,
    },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl RelayError {
    /// Map a backend failure onto the user-visible taxonomy.
    ///
    /// Non-success HTTP statuses count as malformed responses: the backend
    /// was reached but did not produce a usable answer.
    pub fn from_backend(err: BackendError, elapsed: Duration, budget: Duration) -> Self {
        match err {
            BackendError::Unreachable(detail) => RelayError::BackendUnreachable(detail),
            BackendError::Timeout => RelayError::BackendTimeout { elapsed, budget },
            BackendError::Http { status, body } => {
                RelayError::MalformedResponse(format!("HTTP {status}: {body}"))
            }
            BackendError::Malformed(detail) => RelayError::MalformedResponse(detail),
        }
    }

    /// Short machine-friendly name, used in logs and web payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Rejected(Rejection::AlreadyBusy) => "already_busy",
            RelayError::Rejected(Rejection::RateLimited { .. }) => "rate_limited",
            RelayError::BackendUnreachable(_) => "backend_unreachable",
            RelayError::BackendTimeout { .. } => "backend_timeout",
            RelayError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Message posted to the channel for this failure.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Rejected(rejection) => rejection.user_message().to_string(),
            RelayError::BackendUnreachable(_) => {
                "Error: Could not connect to the AI server. Please try again later.".to_string()
            }
            RelayError::BackendTimeout { elapsed, budget } => format!(
                "Error: Your prompt was too complex! AI timed out after {}. ({})",
                describe_budget(*budget),
                format_elapsed(*elapsed)
            ),
            RelayError::MalformedResponse(_) => {
                "Error: Could not parse the AI response.".to_string()
            }
        }
    }
}

fn describe_budget(budget: Duration) -> String {
    let secs = budget.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
    } else {
        format!("{secs} seconds")
    }
}

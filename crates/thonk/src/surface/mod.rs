//! Chat-surface collaborators.
//!
//! The relay never talks to a chat platform directly. A surface (terminal,
//! web, a real chat network) implements two small traits and feeds
//! [`InboundMessage`]s into the [`Relay`] dispatcher:
//!
//! - [`Channel`]: post and delete [`OutboundMessage`]s in the channel the
//!   request came from.
//! - [`Presence`]: show whether the relay is available or busy.
//!
//! ```text
//! surface ──InboundMessage──▶ Relay ──▶ Orchestrator ──OutboundMessage──▶ Channel
//!                                             └──PresenceStatus──▶ Presence
//! ```

pub mod commands;
pub mod flavor;
pub mod memory;
pub mod relay;

pub use commands::{Command, parse_command};
pub use memory::{RecordedPresence, RecordingChannel};
pub use relay::Relay;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Boxed future returned by surface collaborators.
pub type SurfaceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

// ── Identity ───────────────────────────────────────────────────────

/// Stable user identifier supplied by the host surface.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The sender of a message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    /// Display name used in announcements and flavor text.
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
        }
    }
}

/// A chat message as seen by the relay.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InboundMessage {
    pub author: Author,
    pub content: String,
    /// Display names of other channel members, for flavor text.
    #[serde(default)]
    pub members: Vec<String>,
}

impl InboundMessage {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            members: Vec::new(),
        }
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }
}

// ── Outbound messages ──────────────────────────────────────────────

/// Identifier a channel assigns to a posted message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub u64);

/// What a posted message contains.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundBody {
    /// Plain markdown text.
    Text { content: String },
    /// A titled card with optional description and image.
    Embed {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
}

/// A message to post in a channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    #[serde(flatten)]
    pub body: OutboundBody,
    /// Hint that the channel may remove the message after this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after_secs: Option<u64>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            body: OutboundBody::Text {
                content: content.into(),
            },
            expires_after_secs: None,
        }
    }

    pub fn embed(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            body: OutboundBody::Embed {
                title: title.into(),
                description: Some(description.into()),
                image_url: None,
            },
            expires_after_secs: None,
        }
    }

    /// An embed with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            body: OutboundBody::Embed {
                title: title.into(),
                description: None,
                image_url: None,
            },
            expires_after_secs: None,
        }
    }

    /// Attach an image. No-op on text messages.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        if let OutboundBody::Embed { image_url, .. } = &mut self.body {
            *image_url = Some(url.into());
        }
        self
    }

    pub fn expiring(mut self, after: Duration) -> Self {
        self.expires_after_secs = Some(after.as_secs());
        self
    }

    pub fn expires_after(&self) -> Option<Duration> {
        self.expires_after_secs.map(Duration::from_secs)
    }

    /// Flatten to plain text: the content, or the title and description on
    /// separate lines.
    pub fn render(&self) -> String {
        match &self.body {
            OutboundBody::Text { content } => content.clone(),
            OutboundBody::Embed {
                title, description, ..
            } => match description {
                Some(d) => format!("{title}\n{d}"),
                None => title.clone(),
            },
        }
    }
}

// ── Collaborator traits ────────────────────────────────────────────

/// The channel a request came from.
///
/// Errors are plain strings: the relay logs them and carries on, since a
/// failed post must never leave the single-flight slot taken.
pub trait Channel: Send + Sync {
    fn send(&self, message: OutboundMessage) -> SurfaceFuture<'_, MessageId>;
    fn delete(&self, id: MessageId) -> SurfaceFuture<'_, ()>;
}

/// Availability shown by the surface.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Available,
    Busy,
}

/// Surface-level availability indicator.
pub trait Presence: Send + Sync {
    fn set_status(&self, status: PresenceStatus, activity: &str) -> SurfaceFuture<'_, ()>;
}

/// Presence for surfaces that have none.
pub struct NoPresence;

impl Presence for NoPresence {
    fn set_status(&self, _status: PresenceStatus, _activity: &str) -> SurfaceFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_flattens_embeds() {
        assert_eq!(OutboundMessage::text("hi").render(), "hi");
        assert_eq!(OutboundMessage::embed("T", "D").render(), "T\nD");
        assert_eq!(OutboundMessage::titled("T").render(), "T");
    }

    #[test]
    fn with_image_ignores_text() {
        let msg = OutboundMessage::text("hi").with_image("http://x/y.gif");
        assert_eq!(msg.body, OutboundBody::Text { content: "hi".into() });
        let msg = OutboundMessage::titled("T").with_image("http://x/y.gif");
        assert!(matches!(
            msg.body,
            OutboundBody::Embed { image_url: Some(_), .. }
        ));
    }

    #[test]
    fn outbound_serializes_flat() {
        let msg = OutboundMessage::embed("T", "D").expiring(Duration::from_secs(45));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "embed");
        assert_eq!(json["title"], "T");
        assert_eq!(json["expires_after_secs"], 45);
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn user_id_is_transparent() {
        let id = UserId::from("1053809317314318378");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1053809317314318378\"");
        assert_eq!(id.to_string(), "1053809317314318378");
    }
}

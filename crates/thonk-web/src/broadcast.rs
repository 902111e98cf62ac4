//! Messages pushed to WebSocket clients.

use serde::{Deserialize, Serialize};
use thonk::surface::{MessageId, PresenceStatus};

use crate::channel::ChannelEntry;

/// A message sent from the server to WebSocket clients.
///
/// Discriminated on the `type` field when serialized to JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full channel state (sent on connect and after a client lags).
    Snapshot { data: serde_json::Value },
    /// A message appeared in the channel, from a user or the relay.
    Posted { entry: ChannelEntry },
    /// A message was removed (expired notice, loading indicator).
    Deleted { id: MessageId },
    /// The relay changed its presence.
    Presence {
        status: PresenceStatus,
        activity: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_by_type() {
        let json = serde_json::to_value(WsMessage::Deleted { id: MessageId(7) }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "deleted", "id": 7}));

        let json = serde_json::to_value(WsMessage::Presence {
            status: PresenceStatus::Busy,
            activity: "x".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "presence");
        assert_eq!(json["status"], "busy");
    }
}

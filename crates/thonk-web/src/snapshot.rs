//! Serializable view of a [`WebChannel`] for WebSocket and REST transport.

use serde::Serialize;
use thonk::surface::PresenceStatus;

use crate::channel::{ChannelEntry, WebChannel};

/// What the relay currently shows as its status.
#[derive(Debug, Serialize)]
pub struct PresenceSnapshot {
    pub status: PresenceStatus,
    pub activity: String,
}

/// Full channel state sent on connect and served at `GET /api/channel`.
#[derive(Debug, Serialize)]
pub struct ChannelSnapshot {
    pub presence: PresenceSnapshot,
    pub members: Vec<String>,
    pub messages: Vec<ChannelEntry>,
}

impl PresenceSnapshot {
    pub fn from_channel(channel: &WebChannel) -> Self {
        let (status, activity) = channel.presence();
        Self { status, activity }
    }
}

impl ChannelSnapshot {
    pub fn from_channel(channel: &WebChannel) -> Self {
        Self {
            presence: PresenceSnapshot::from_channel(channel),
            members: channel.members(),
            messages: channel.history(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thonk::surface::{Author, Channel, OutboundMessage};

    #[tokio::test]
    async fn snapshot_carries_history_and_members() {
        let channel = WebChannel::new(8, 8);
        channel.record_user(&Author::new("1", "ada"), "!ai hi");
        channel
            .send(OutboundMessage::embed("T", "D"))
            .await
            .unwrap();

        let json = ChannelSnapshot::from_channel(&channel).to_json();
        assert_eq!(json["presence"]["status"], "available");
        assert_eq!(json["members"], serde_json::json!(["ada"]));
        assert_eq!(json["messages"][0]["from"], "ada");
        assert_eq!(json["messages"][0]["body"]["content"], "!ai hi");
        assert_eq!(json["messages"][1]["body"]["kind"], "embed");
        assert!(json["messages"][1].get("from").is_none());
    }
}

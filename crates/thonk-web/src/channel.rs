//! A chat channel that lives in the server.
//!
//! [`WebChannel`] implements the relay's [`Channel`] and [`Presence`] traits.
//! It keeps a bounded history for snapshots, remembers who has spoken so
//! flavor text can name them, honors expiry hints by deleting messages after
//! the requested delay, and broadcasts every change as a [`WsMessage`].

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thonk::surface::{
    Author, Channel, MessageId, OutboundMessage, Presence, PresenceStatus, SurfaceFuture,
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::broadcast::WsMessage;

/// One message in the channel history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub id: MessageId,
    /// Display name of the user who wrote it. `None` for relay posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub body: OutboundMessage,
}

struct State {
    next_id: u64,
    history: VecDeque<ChannelEntry>,
    history_limit: usize,
    members: BTreeSet<String>,
    presence: (PresenceStatus, String),
}

/// Shared handle to the server's channel. Cheap to clone.
#[derive(Clone)]
pub struct WebChannel {
    state: Arc<Mutex<State>>,
    broadcast_tx: broadcast::Sender<WsMessage>,
}

impl WebChannel {
    /// `broadcast_capacity` bounds how far a WebSocket client may lag before
    /// it is resynchronized; `history_limit` bounds the snapshot history.
    pub fn new(broadcast_capacity: usize, history_limit: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                history: VecDeque::new(),
                history_limit: history_limit.max(1),
                members: BTreeSet::new(),
                presence: (PresenceStatus::Available, String::new()),
            })),
            broadcast_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Record a message written by a user and remember them as a member.
    pub fn record_user(&self, author: &Author, content: &str) -> MessageId {
        let entry = {
            let mut state = self.lock();
            state.members.insert(author.name.clone());
            state.push(Some(author.name.clone()), OutboundMessage::text(content))
        };
        let id = entry.id;
        let _ = self.broadcast_tx.send(WsMessage::Posted { entry });
        id
    }

    /// Names of users seen in the channel, except `name`.
    pub fn members_except(&self, name: &str) -> Vec<String> {
        self.lock()
            .members
            .iter()
            .filter(|m| *m != name)
            .cloned()
            .collect()
    }

    /// Current history, oldest first.
    pub fn history(&self) -> Vec<ChannelEntry> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn presence(&self) -> (PresenceStatus, String) {
        self.lock().presence.clone()
    }

    pub fn members(&self) -> Vec<String> {
        self.lock().members.iter().cloned().collect()
    }

    fn post(&self, body: OutboundMessage) -> MessageId {
        let expiry = body.expires_after();
        let entry = self.lock().push(None, body);
        let id = entry.id;
        let _ = self.broadcast_tx.send(WsMessage::Posted { entry });

        if let Some(after) = expiry {
            let channel = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if channel.remove(id) {
                    debug!("Expired message #{}", id.0);
                }
            });
        }
        id
    }

    /// Remove `id` from history. Returns whether it was there.
    fn remove(&self, id: MessageId) -> bool {
        let removed = {
            let mut state = self.lock();
            let before = state.history.len();
            state.history.retain(|e| e.id != id);
            state.history.len() != before
        };
        if removed {
            let _ = self.broadcast_tx.send(WsMessage::Deleted { id });
        }
        removed
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl State {
    fn push(&mut self, from: Option<String>, body: OutboundMessage) -> ChannelEntry {
        self.next_id += 1;
        let entry = ChannelEntry {
            id: MessageId(self.next_id),
            from,
            body,
        };
        self.history.push_back(entry.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        entry
    }
}

impl Channel for WebChannel {
    fn send(&self, message: OutboundMessage) -> SurfaceFuture<'_, MessageId> {
        Box::pin(async move { Ok(self.post(message)) })
    }

    fn delete(&self, id: MessageId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            if self.remove(id) {
                Ok(())
            } else {
                Err(format!("message {} is not in the channel", id.0))
            }
        })
    }
}

impl Presence for WebChannel {
    fn set_status(&self, status: PresenceStatus, activity: &str) -> SurfaceFuture<'_, ()> {
        let activity = activity.to_string();
        Box::pin(async move {
            self.lock().presence = (status, activity.clone());
            let _ = self
                .broadcast_tx
                .send(WsMessage::Presence { status, activity });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn posts_are_recorded_and_broadcast() {
        let channel = WebChannel::new(16, 10);
        let mut rx = channel.subscribe();

        let id = channel.send(OutboundMessage::text("hi")).await.unwrap();
        assert_eq!(channel.history().len(), 1);
        match rx.recv().await.unwrap() {
            WsMessage::Posted { entry } => {
                assert_eq!(entry.id, id);
                assert_eq!(entry.from, None);
            }
            other => panic!("unexpected {other:?}"),
        }

        channel.delete(id).await.unwrap();
        assert!(channel.history().is_empty());
        assert!(matches!(rx.recv().await.unwrap(), WsMessage::Deleted { id: d } if d == id));
        assert!(channel.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let channel = WebChannel::new(16, 3);
        for i in 0..5 {
            channel.send(OutboundMessage::text(format!("m{i}"))).await.unwrap();
        }
        let rendered: Vec<String> = channel.history().iter().map(|e| e.body.render()).collect();
        assert_eq!(rendered, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn expiring_messages_disappear() {
        let channel = WebChannel::new(16, 10);
        channel
            .send(OutboundMessage::text("brb").expiring(Duration::from_secs(45)))
            .await
            .unwrap();
        channel.send(OutboundMessage::text("stays")).await.unwrap();

        tokio::time::sleep(Duration::from_secs(44)).await;
        assert_eq!(channel.history().len(), 2);
        tokio::time::sleep(Duration::from_secs(2)).await;
        let left: Vec<String> = channel.history().iter().map(|e| e.body.render()).collect();
        assert_eq!(left, vec!["stays"]);
    }

    #[tokio::test]
    async fn members_are_remembered() {
        let channel = WebChannel::new(16, 10);
        channel.record_user(&Author::new("1", "ada"), "hi");
        channel.record_user(&Author::new("2", "grace"), "hey");
        channel.record_user(&Author::new("1", "ada"), "again");
        assert_eq!(channel.members(), vec!["ada", "grace"]);
        assert_eq!(channel.members_except("ada"), vec!["grace"]);
        assert_eq!(channel.history()[0].from.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn presence_changes_are_kept() {
        let channel = WebChannel::new(16, 10);
        channel.set_status(PresenceStatus::Busy, "cooking").await.unwrap();
        assert_eq!(channel.presence(), (PresenceStatus::Busy, "cooking".to_string()));
    }
}

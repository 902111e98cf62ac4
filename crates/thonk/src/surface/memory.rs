//! In-memory [`Channel`] and [`Presence`] that record everything.
//!
//! Used by the terminal surface's tests, the orchestrator tests, and as a
//! starting point for surfaces that keep their own history.

use std::sync::{Arc, Mutex};

use super::{
    Channel, MessageId, OutboundMessage, Presence, PresenceStatus, SurfaceFuture,
};

#[derive(Default)]
struct Log {
    next_id: u64,
    attempts: u64,
    fail_on: Vec<u64>,
    posted: Vec<(MessageId, OutboundMessage)>,
    deleted: Vec<MessageId>,
}

/// A channel that keeps every posted message in order.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    log: Arc<Mutex<Log>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `attempt`-th call to `send` (1-based) fail without posting.
    pub fn failing_send(self, attempt: u64) -> Self {
        self.lock().fail_on.push(attempt);
        self
    }

    /// Everything ever posted, oldest first, deleted messages included.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.lock().posted.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Posted messages that were not deleted.
    pub fn live(&self) -> Vec<OutboundMessage> {
        let log = self.lock();
        log.posted
            .iter()
            .filter(|(id, _)| !log.deleted.contains(id))
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.lock().deleted.clone()
    }

    /// All posted messages flattened with [`OutboundMessage::render`].
    pub fn transcript(&self) -> Vec<String> {
        self.sent().iter().map(OutboundMessage::render).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Channel for RecordingChannel {
    fn send(&self, message: OutboundMessage) -> SurfaceFuture<'_, MessageId> {
        Box::pin(async move {
            let mut log = self.lock();
            log.attempts += 1;
            if log.fail_on.contains(&log.attempts) {
                return Err(format!("send #{} refused", log.attempts));
            }
            log.next_id += 1;
            let id = MessageId(log.next_id);
            log.posted.push((id, message));
            Ok(id)
        })
    }

    fn delete(&self, id: MessageId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let mut log = self.lock();
            if !log.posted.iter().any(|(posted, _)| *posted == id) {
                return Err(format!("unknown message {}", id.0));
            }
            log.deleted.push(id);
            Ok(())
        })
    }
}

/// A presence that keeps every status change in order.
#[derive(Clone, Default)]
pub struct RecordedPresence {
    changes: Arc<Mutex<Vec<(PresenceStatus, String)>>>,
}

impl RecordedPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<(PresenceStatus, String)> {
        self.changes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current(&self) -> Option<PresenceStatus> {
        self.changes().last().map(|(s, _)| *s)
    }
}

impl Presence for RecordedPresence {
    fn set_status(&self, status: PresenceStatus, activity: &str) -> SurfaceFuture<'_, ()> {
        let activity = activity.to_string();
        Box::pin(async move {
            self.changes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((status, activity));
            Ok(())
        })
    }
}

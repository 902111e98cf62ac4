//! [`ContextStore`]: per-user drop-from-front windows.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::surface::UserId;

/// Entries kept per user.
pub const DEFAULT_CONTEXT_CAPACITY: usize = 5;

/// Who said it. Only user turns are recorded today.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryRole {
    User,
}

/// One remembered turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConversationEntry {
    pub role: EntryRole,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::User,
            text: text.into(),
        }
    }
}

/// Per-user bounded history. Oldest entries are evicted first.
#[derive(Debug)]
pub struct ContextStore {
    windows: Mutex<HashMap<UserId, VecDeque<ConversationEntry>>>,
    capacity: usize,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_CAPACITY)
    }
}

impl ContextStore {
    /// A zero capacity is bumped to one so that the latest entry is always kept.
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&self, user: &UserId, entry: ConversationEntry) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows
            .entry(user.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));
        window.push_back(entry);
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// Oldest-first copy of the user's window.
    pub fn window(&self, user: &UserId) -> Vec<ConversationEntry> {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, user: &UserId) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .map_or(0, VecDeque::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

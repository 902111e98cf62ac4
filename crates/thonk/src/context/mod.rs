//! Bounded per-user conversation history.
//!
//! Every admitted prompt is remembered in a per-user [`ContextStore`] window
//! of at most five entries. The window is not sent to the backend: the
//! outbound prompt is only the current message. Surfaces can read it (e.g. to
//! display recent history) and a history-aware prompt builder can be layered
//! on top without touching admission.

pub mod window;

pub use window::{ContextStore, ConversationEntry, DEFAULT_CONTEXT_CAPACITY, EntryRole};

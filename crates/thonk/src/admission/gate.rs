//! Process-wide single-flight admission.
//!
//! The in-flight flag is a one-permit [`Semaphore`]. Nothing outside this
//! module can touch it: callers only see [`RequestGate::admit`], which hands
//! out an [`Admission`] holding the permit, and [`Admission::release`] (or a
//! plain drop), which gives it back.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::admission::limiter::RateLimiter;
use crate::context::{ContextStore, ConversationEntry};
use crate::error::Rejection;
use crate::surface::UserId;

/// Single-flight gate in front of the backend.
#[derive(Debug)]
pub struct RequestGate {
    slot: Arc<Semaphore>,
    limiter: RateLimiter,
    context: ContextStore,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(RateLimiter::default(), ContextStore::default())
    }
}

impl RequestGate {
    pub fn new(limiter: RateLimiter, context: ContextStore) -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            limiter,
            context,
        }
    }

    /// Decide whether `user` may start a backend call for `prompt`.
    ///
    /// Checks run in a fixed order:
    /// 1. slot already taken → [`Rejection::AlreadyBusy`], counter untouched;
    /// 2. counter incremented, over threshold → [`Rejection::RateLimited`]
    ///    (the increment sticks, and the slot is handed straight back);
    /// 3. prompt appended to the user's context window.
    pub fn admit(&self, user: &UserId, prompt: &str) -> Result<Admission, Rejection> {
        let permit = self
            .slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| Rejection::AlreadyBusy)?;

        let count = self.limiter.increment_and_check(user);
        if self.limiter.exceeds(count) {
            debug!("Rate limit hit for {user}: {count}/{}", self.limiter.threshold());
            return Err(Rejection::RateLimited {
                count,
                threshold: self.limiter.threshold(),
            });
        }

        self.context.append(user, ConversationEntry::user(prompt));

        Ok(Admission {
            user: user.clone(),
            count,
            _permit: permit,
        })
    }

    /// Whether a backend call is currently admitted.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }
}

/// Proof of admission. Holds the single-flight slot until released or dropped.
#[derive(Debug)]
#[must_use = "dropping an Admission immediately frees the single-flight slot"]
pub struct Admission {
    user: UserId,
    count: u32,
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// The user's request count including this one.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Free the slot. Consumes the admission, so it can happen only once.
    pub fn release(self) {
        debug!("Releasing single-flight slot held by {}", self.user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> RequestGate {
        RequestGate::default()
    }

    #[test]
    fn admitted_requests_are_counted() {
        let gate = gate();
        let user = UserId::from("u");
        for k in 1..=5 {
            let admission = gate.admit(&user, "hi").expect("within threshold");
            assert_eq!(admission.count(), k);
            admission.release();
        }
        assert_eq!(gate.limiter().count(&user), 5);
    }

    #[test]
    fn sixth_attempt_and_beyond_are_rate_limited() {
        let gate = gate();
        let user = UserId::from("u");
        for _ in 0..5 {
            gate.admit(&user, "hi").unwrap().release();
        }
        for expected in 6..=8 {
            assert_eq!(
                gate.admit(&user, "hi").unwrap_err(),
                Rejection::RateLimited {
                    count: expected,
                    threshold: 5
                }
            );
        }
        // The rejection does not leave the slot taken.
        assert!(!gate.is_busy());
        assert!(gate.admit(&UserId::from("other"), "hi").is_ok());
    }

    #[test]
    fn busy_gate_rejects_everyone_without_counting() {
        let gate = gate();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        let held = gate.admit(&alice, "long question").unwrap();
        assert!(gate.is_busy());
        assert_eq!(gate.admit(&bob, "me too").unwrap_err(), Rejection::AlreadyBusy);
        assert_eq!(gate.admit(&alice, "again").unwrap_err(), Rejection::AlreadyBusy);
        assert_eq!(gate.limiter().count(&bob), 0);
        assert_eq!(gate.limiter().count(&alice), 1);

        held.release();
        assert!(!gate.is_busy());
        assert!(gate.admit(&bob, "now?").is_ok());
    }

    #[test]
    fn dropping_admission_frees_the_slot() {
        let gate = gate();
        {
            let _admission = gate.admit(&UserId::from("u"), "hi").unwrap();
            assert!(gate.is_busy());
        }
        assert!(!gate.is_busy());
    }

    #[test]
    fn admission_appends_prompt_to_context() {
        let gate = gate();
        let user = UserId::from("u");
        gate.admit(&user, "first").unwrap().release();
        gate.admit(&user, "second").unwrap().release();
        let texts: Vec<String> = gate
            .context()
            .window(&user)
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn rejected_prompts_are_not_remembered() {
        let gate = gate();
        let user = UserId::from("u");
        let _held = gate.admit(&UserId::from("other"), "busy").unwrap();
        let _ = gate.admit(&user, "dropped");
        assert!(gate.context().window(&user).is_empty());
    }
}

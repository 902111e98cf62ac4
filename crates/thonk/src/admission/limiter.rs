//! Per-user request counters.
//!
//! Counts never decay or reset: once a user passes the threshold they stay
//! over it until the process restarts.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::surface::UserId;

/// Highest count still admitted.
pub const DEFAULT_RATE_THRESHOLD: u32 = 5;

/// Lifetime request counter per user.
#[derive(Debug)]
pub struct RateLimiter {
    counts: Mutex<HashMap<UserId, u32>>,
    threshold: u32,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_THRESHOLD)
    }
}

impl RateLimiter {
    pub fn new(threshold: u32) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            threshold,
        }
    }

    /// Count one more request for `user` and return the new total.
    ///
    /// The first request from an unseen user returns 1.
    pub fn increment_and_check(&self, user: &UserId) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(user.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Whether a post-increment count is over the threshold.
    pub fn exceeds(&self, count: u32) -> bool {
        count > self.threshold
    }

    /// Current total for `user` (0 if never seen).
    pub fn count(&self, user: &UserId) -> u32 {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .copied()
            .unwrap_or(0)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_user_starts_at_one() {
        let limiter = RateLimiter::default();
        let user = UserId::from("new");
        assert_eq!(limiter.count(&user), 0);
        assert_eq!(limiter.increment_and_check(&user), 1);
        assert_eq!(limiter.count(&user), 1);
    }

    #[test]
    fn counts_are_per_user_and_monotonic() {
        let limiter = RateLimiter::default();
        let a = UserId::from("a");
        let b = UserId::from("b");
        let mut last = 0;
        for _ in 0..8 {
            let now = limiter.increment_and_check(&a);
            assert!(now > last);
            last = now;
        }
        assert_eq!(limiter.count(&a), 8);
        assert_eq!(limiter.increment_and_check(&b), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let limiter = RateLimiter::new(5);
        assert!(!limiter.exceeds(5));
        assert!(limiter.exceeds(6));
    }
}

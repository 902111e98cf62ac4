//! Admission control: who may start a backend call, and when.
//!
//! - [`gate`]: [`RequestGate`], the process-wide single-flight slot. A
//!   successful [`admit`](RequestGate::admit) returns an [`Admission`] that
//!   frees the slot when dropped, so the slot cannot stay taken past the end
//!   of the request on any exit path.
//! - [`limiter`]: [`RateLimiter`], per-user lifetime request counters.

pub mod gate;
pub mod limiter;

pub use gate::{Admission, RequestGate};
pub use limiter::{DEFAULT_RATE_THRESHOLD, RateLimiter};

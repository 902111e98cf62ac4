//! Wall-clock helpers for announcements and elapsed-time tags.

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

/// `H:MM:SS`, rounded to the nearest second. Hours are not wrapped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs() + u64::from(elapsed.subsec_millis() >= 500);
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Current local time rounded to the nearest second.
pub fn rounded_now() -> DateTime<Local> {
    round_to_second(Local::now())
}

/// Round half up to a whole second.
pub fn round_to_second(at: DateTime<Local>) -> DateTime<Local> {
    let nanos = at.timestamp_subsec_nanos();
    let floored = at - TimeDelta::nanoseconds(i64::from(nanos));
    if nanos >= 500_000_000 {
        floored + TimeDelta::seconds(1)
    } else {
        floored
    }
}

/// `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

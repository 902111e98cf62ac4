//! Progress notices while a backend call is outstanding.
//!
//! A [`Heartbeat`] is built idle, [`start`](Heartbeat::start)ed into a
//! running background task, and stopped through its [`HeartbeatHandle`].
//! It never finishes by itself.
//!
//! Each cycle suspends for the next interval of a [`HeartbeatSchedule`] and
//! then posts one flavor notice tagged with the time since start. Once the
//! interval has hit its cap, every cycle also posts a "still processing"
//! notice. With the default schedule notices land 45, 70, 95, 120, 145, 170,
//! 180, 180, ... seconds apart.
//!
//! Cancellation is observed at every suspension and re-checked before every
//! post, so once [`HeartbeatHandle::cancel`] returns nothing more is posted.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::surface::flavor::{NoticeContext, STILL_PROCESSING, flavor_line, notice_footer};
use crate::surface::{Channel, OutboundMessage};

use super::clock::format_elapsed;
use super::events::{EventHandler, RelayEvent};

/// Flavor notices are removed after this long.
pub const NOTICE_EXPIRY: Duration = Duration::from_secs(45);

/// The "still processing" notice is removed after this long.
pub const STILL_PROCESSING_EXPIRY: Duration = Duration::from_secs(30);

// ── Schedule ───────────────────────────────────────────────────────

/// Escalating interval parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSchedule {
    /// First interval. Default: 45 s.
    pub initial: Duration,
    /// Growth per cycle. Default: 25 s.
    pub increment: Duration,
    /// Longest interval. Default: 180 s.
    pub cap: Duration,
}

impl Default for HeartbeatSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(45),
            increment: Duration::from_secs(25),
            cap: Duration::from_secs(180),
        }
    }
}

/// One cycle of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// How long to wait before this cycle's notice.
    pub interval: Duration,
    /// The uncapped interval would have exceeded the cap.
    pub clamped: bool,
}

impl HeartbeatSchedule {
    /// The endless sequence of cycles.
    pub fn intervals(&self) -> Intervals {
        Intervals {
            schedule: *self,
            cycle: 0,
        }
    }
}

/// Iterator returned by [`HeartbeatSchedule::intervals`]. Never ends.
#[derive(Debug, Clone)]
pub struct Intervals {
    schedule: HeartbeatSchedule,
    cycle: u32,
}

impl Iterator for Intervals {
    type Item = Beat;

    fn next(&mut self) -> Option<Beat> {
        let HeartbeatSchedule {
            initial,
            increment,
            cap,
        } = self.schedule;
        let uncapped = increment
            .checked_mul(self.cycle)
            .and_then(|grown| initial.checked_add(grown));
        self.cycle = self.cycle.saturating_add(1);
        Some(match uncapped {
            Some(interval) if interval <= cap => Beat {
                interval,
                clamped: false,
            },
            _ => Beat {
                interval: cap,
                clamped: true,
            },
        })
    }
}

// ── Heartbeat ──────────────────────────────────────────────────────

/// An idle heartbeat for one in-flight request.
pub struct Heartbeat {
    schedule: HeartbeatSchedule,
    channel: Arc<dyn Channel>,
    notice: NoticeContext,
    events: Arc<dyn EventHandler>,
}

impl Heartbeat {
    pub fn new(
        schedule: HeartbeatSchedule,
        channel: Arc<dyn Channel>,
        notice: NoticeContext,
        events: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            schedule,
            channel,
            notice,
            events,
        }
    }

    /// Spawn the notice loop. Must be called inside a Tokio runtime.
    pub fn start(self) -> HeartbeatHandle {
        let token = CancellationToken::new();
        let events = self.events.clone();
        let task = tokio::spawn(self.run(token.clone()));
        HeartbeatHandle {
            token,
            task: Some(task),
            events,
        }
    }

    /// Returns the number of flavor notices posted.
    async fn run(self, token: CancellationToken) -> u32 {
        let started = Instant::now();
        let mut notices = 0u32;

        for beat in self.schedule.intervals() {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(beat.interval) => {}
            }
            if token.is_cancelled() {
                break;
            }

            let elapsed = started.elapsed();
            let title = {
                let mut rng = rand::thread_rng();
                flavor_line(&self.notice, &mut rng)
            };
            let notice = OutboundMessage::embed(title, notice_footer(&format_elapsed(elapsed)))
                .expiring(NOTICE_EXPIRY);
            self.post(notice).await;
            notices += 1;
            self.events.on_event(&RelayEvent::HeartbeatNotice {
                elapsed,
                clamped: beat.clamped,
            });

            if beat.clamped {
                if token.is_cancelled() {
                    break;
                }
                self.post(OutboundMessage::text(STILL_PROCESSING).expiring(STILL_PROCESSING_EXPIRY))
                    .await;
            }
        }

        notices
    }

    async fn post(&self, message: OutboundMessage) {
        if let Err(e) = self.channel.send(message).await {
            self.events.on_event(&RelayEvent::SurfaceError {
                action: "heartbeat notice",
                error: &e,
            });
        }
    }
}

/// Running heartbeat. Dropping it cancels the loop as well.
pub struct HeartbeatHandle {
    token: CancellationToken,
    task: Option<JoinHandle<u32>>,
    events: Arc<dyn EventHandler>,
}

impl HeartbeatHandle {
    /// Stop the loop and wait for it to wind down.
    ///
    /// Returns the number of flavor notices that were posted.
    pub async fn cancel(mut self) -> u32 {
        self.token.cancel();
        let notices = match self.task.take() {
            Some(task) => task.await.unwrap_or(0),
            None => 0,
        };
        self.events
            .on_event(&RelayEvent::HeartbeatCancelled { notices });
        notices
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

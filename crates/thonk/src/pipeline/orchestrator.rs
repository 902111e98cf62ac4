//! One prompt, from admission to the last delivered part.
//!
//! ```text
//! admit ──▶ busy ──▶ announce ──▶ heartbeat + backend call (timeout)
//!   │                                   │
//!   └─ rejection message                ▼
//!                      cancel heartbeat, free slot, available, drop loading
//!                                       │
//!                     extract ──▶ normalize ──▶ banner ──▶ parts
//! ```
//!
//! Every failure is turned into one channel message and an [`Outcome`];
//! nothing escapes [`Orchestrator::handle`]. The single-flight slot and the
//! heartbeat are owned by values that release on drop, so they are freed even
//! if the handling future itself is dropped mid-call.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::admission::{RateLimiter, RequestGate};
use crate::config::{DeliveryMode, RelayConfig};
use crate::context::ContextStore;
use crate::delivery::framing::{announcement, completion_banner, loading_indicator};
use crate::delivery::{frame_answer, process_large, send_large};
use crate::error::{Rejection, RelayError};
use crate::surface::flavor::{NoticeContext, loading_animation, presence_activity};
use crate::surface::{Author, Channel, MessageId, OutboundMessage, Presence, PresenceStatus};
use crate::{Backend, GenerateRequest, response_text};

use super::clock::{format_timestamp, rounded_now};
use super::events::{EventHandler, NoopHandler, RelayEvent};
use super::heartbeat::{Heartbeat, HeartbeatSchedule};
use super::normalize::Normalizer;

/// An `ai` command ready to run.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub author: Author,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    /// Channel member names for heartbeat flavor text.
    pub members: Vec<String>,
}

/// How a request ended.
#[derive(Debug)]
pub enum Outcome {
    Rejected(Rejection),
    Failed(RelayError),
    Delivered {
        /// Answer messages the channel accepted, banner excluded.
        parts: usize,
        /// From the start of the call to the banner.
        elapsed: Duration,
    },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }
}

/// Delivery settings taken from [`RelayConfig`].
#[derive(Debug, Clone)]
struct Plan {
    budget: Duration,
    heartbeat: HeartbeatSchedule,
    delivery: DeliveryMode,
    chunk_limit: usize,
    send_limit: usize,
    pacing: Duration,
    bot_name: String,
}

/// Runs prompts through the gate, the backend and delivery.
pub struct Orchestrator {
    gate: RequestGate,
    backend: Arc<dyn Backend>,
    presence: Arc<dyn Presence>,
    normalizer: Normalizer,
    events: Arc<dyn EventHandler>,
    plan: Plan,
}

impl Orchestrator {
    pub fn new(config: &RelayConfig, backend: Arc<dyn Backend>, presence: Arc<dyn Presence>) -> Self {
        let gate = RequestGate::new(
            RateLimiter::new(config.rate_threshold),
            ContextStore::new(config.context_capacity),
        );
        Self {
            gate,
            backend,
            presence,
            normalizer: Normalizer::default(),
            events: Arc::new(NoopHandler),
            plan: Plan {
                budget: config.timeouts.total,
                heartbeat: config.heartbeat,
                delivery: config.delivery,
                chunk_limit: config.chunk_limit,
                send_limit: config.send_limit,
                pacing: config.pacing,
                bot_name: config.bot_name.clone(),
            },
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.events = events;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub(crate) fn events(&self) -> &Arc<dyn EventHandler> {
        &self.events
    }

    /// Run one prompt to completion.
    pub async fn handle(&self, request: PromptRequest, channel: Arc<dyn Channel>) -> Outcome {
        let user = &request.author.id;

        // Admitting
        let admission = match self.gate.admit(user, &request.prompt) {
            Ok(admission) => admission,
            Err(rejection) => {
                self.events.on_event(&RelayEvent::Rejected {
                    user,
                    rejection: &rejection,
                });
                self.post(channel.as_ref(), OutboundMessage::text(rejection.user_message()))
                    .await;
                return Outcome::Rejected(rejection);
            }
        };
        self.events.on_event(&RelayEvent::Admitted {
            user,
            count: admission.count(),
        });

        // Calling
        self.show(PresenceStatus::Busy).await;
        let started = Instant::now();
        let started_at = format_timestamp(rounded_now());
        self.post(
            channel.as_ref(),
            announcement(&request.author.name, &started_at, &request.model),
        )
        .await;
        let animation = loading_animation(&mut rand::thread_rng());
        let loading = self
            .post(channel.as_ref(), loading_indicator(animation))
            .await;

        let heartbeat = Heartbeat::new(
            self.plan.heartbeat,
            channel.clone(),
            NoticeContext::new(
                request.author.name.clone(),
                self.plan.bot_name.clone(),
                request.members.clone(),
            ),
            self.events.clone(),
        )
        .start();

        let body = GenerateRequest::new(&request.model, &request.prompt, request.temperature);
        self.events.on_event(&RelayEvent::CallStarted {
            user,
            model: &body.model,
            prompt: &body.prompt,
        });
        let budget = self.plan.budget;
        let result = tokio::time::timeout(budget, self.backend.generate(&body)).await;
        let elapsed = started.elapsed();

        heartbeat.cancel().await;
        admission.release();
        self.show(PresenceStatus::Available).await;
        if let Some(id) = loading {
            self.remove(channel.as_ref(), id).await;
        }

        // PostProcessing
        let text = match result {
            Ok(Ok(reply)) => response_text(&reply).map(str::to_string).ok_or_else(|| {
                RelayError::MalformedResponse("reply has no \"response\" string".to_string())
            }),
            Ok(Err(e)) => Err(RelayError::from_backend(e, elapsed, budget)),
            Err(_) => Err(RelayError::BackendTimeout { elapsed, budget }),
        };
        let text = match text {
            Ok(text) => text,
            Err(error) => {
                self.events.on_event(&RelayEvent::CallFailed { error: &error });
                self.post(channel.as_ref(), OutboundMessage::text(error.user_message()))
                    .await;
                return Outcome::Failed(error);
            }
        };
        let answer = self.normalizer.apply(&text);
        self.events.on_event(&RelayEvent::Normalized {
            chars: answer.chars().count(),
        });

        // Delivering
        let elapsed = started.elapsed();
        self.post(channel.as_ref(), completion_banner(elapsed)).await;
        let parts = match self.plan.delivery {
            DeliveryMode::Framed => {
                let chunks = process_large(&answer, self.plan.chunk_limit);
                let framed = frame_answer(
                    &chunks,
                    &request.author.name,
                    &self.plan.bot_name,
                    &request.prompt,
                );
                let mut parts = 0;
                for message in framed {
                    if self.post(channel.as_ref(), message).await.is_some() {
                        parts += 1;
                    }
                }
                parts
            }
            DeliveryMode::Paced => {
                let report = send_large(
                    channel.as_ref(),
                    &answer,
                    self.plan.send_limit,
                    self.plan.pacing,
                )
                .await;
                for error in &report.failures {
                    self.events.on_event(&RelayEvent::SurfaceError {
                        action: "paced send",
                        error: error.as_str(),
                    });
                }
                report.sent
            }
        };
        self.events
            .on_event(&RelayEvent::Delivered { parts, elapsed });
        Outcome::Delivered { parts, elapsed }
    }

    /// Post a message, reporting failures as events.
    pub(crate) async fn post(
        &self,
        channel: &dyn Channel,
        message: OutboundMessage,
    ) -> Option<MessageId> {
        match channel.send(message).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.events.on_event(&RelayEvent::SurfaceError {
                    action: "send",
                    error: &e,
                });
                None
            }
        }
    }

    async fn remove(&self, channel: &dyn Channel, id: MessageId) {
        if let Err(e) = channel.delete(id).await {
            self.events.on_event(&RelayEvent::SurfaceError {
                action: "delete",
                error: &e,
            });
        }
    }

    async fn show(&self, status: PresenceStatus) {
        let activity = presence_activity(status, &mut rand::thread_rng());
        if let Err(e) = self.presence.set_status(status, activity).await {
            self.events.on_event(&RelayEvent::SurfaceError {
                action: "presence",
                error: &e,
            });
        }
    }
}

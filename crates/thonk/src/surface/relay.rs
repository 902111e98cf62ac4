//! Dispatch of inbound chat messages.

use std::sync::Arc;

use crate::Backend;
use crate::config::{RelayConfig, SettingsStore};
use crate::pipeline::events::{EventHandler, RelayEvent};
use crate::pipeline::orchestrator::{Orchestrator, Outcome, PromptRequest};

use super::commands::{Command, parse_command};
use super::{Channel, InboundMessage, OutboundMessage, Presence};

/// Front door of the relay: filters, parses and routes chat messages.
///
/// One `Relay` serves every channel of a surface. It is `Sync`, so a surface
/// can hand each inbound message to its own task; the single-flight gate
/// inside keeps backend calls serialized.
pub struct Relay {
    config: RelayConfig,
    settings: SettingsStore,
    orchestrator: Orchestrator,
}

impl Relay {
    pub fn new(config: RelayConfig, backend: Arc<dyn Backend>, presence: Arc<dyn Presence>) -> Self {
        let orchestrator = Orchestrator::new(&config, backend, presence);
        Self {
            config,
            settings: SettingsStore::new(),
            orchestrator,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.orchestrator = self.orchestrator.with_events(events);
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Handle one chat message.
    ///
    /// Returns the pipeline outcome for `ai` commands that got as far as the
    /// gate, `None` for everything else.
    pub async fn handle_message(
        &self,
        message: InboundMessage,
        channel: Arc<dyn Channel>,
    ) -> Option<Outcome> {
        let events = self.orchestrator.events();
        let bot = self.config.bot_name.as_str();
        if message.author.name == bot || message.author.id.as_str() == bot {
            events.on_event(&RelayEvent::Ignored {
                reason: "own message",
            });
            return None;
        }

        let prefix = self.config.command_prefix.as_str();
        let command = match parse_command(&message.content, prefix) {
            Ok(Some(command)) => command,
            Ok(None) => {
                events.on_event(&RelayEvent::Ignored {
                    reason: "not a command",
                });
                return None;
            }
            Err(usage) => {
                self.orchestrator
                    .post(channel.as_ref(), OutboundMessage::text(usage))
                    .await;
                return None;
            }
        };

        match command {
            Command::Config { model, temperature } => {
                let user = &message.author.id;
                let settings = self.settings.configure(user, model, temperature);
                events.on_event(&RelayEvent::SettingsUpdated {
                    user,
                    settings: &settings,
                });
                let reply = format!(
                    "Configured: Model={}, Temperature={}",
                    settings.model, settings.temperature
                );
                self.orchestrator
                    .post(channel.as_ref(), OutboundMessage::text(reply))
                    .await;
                None
            }
            Command::Ai { prompt } if prompt.is_empty() => {
                self.orchestrator
                    .post(
                        channel.as_ref(),
                        OutboundMessage::text(format!("Usage: {prefix}ai <prompt>")),
                    )
                    .await;
                None
            }
            Command::Ai { prompt } => {
                let settings = self
                    .settings
                    .resolve(&message.author.id, &self.config.default_settings());
                let request = PromptRequest {
                    author: message.author,
                    prompt,
                    model: settings.model,
                    temperature: settings.temperature,
                    members: message.members,
                };
                Some(self.orchestrator.handle(request, channel).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, Rejection};
    use crate::surface::{Author, NoPresence, RecordingChannel};
    use crate::{BackendFuture, GenerateRequest};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoBackend {
        calls: Mutex<Vec<GenerateRequest>>,
    }

    impl Backend for EchoBackend {
        fn generate<'a>(&'a self, request: &'a GenerateRequest) -> BackendFuture<'a> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(request.clone());
                if request.prompt == "fail" {
                    return Err(BackendError::Unreachable("down".into()));
                }
                Ok(json!({ "response": format!("echo {}", request.prompt) }))
            })
        }
    }

    fn relay() -> (Relay, Arc<EchoBackend>, RecordingChannel) {
        let backend = Arc::new(EchoBackend::default());
        let relay = Relay::new(RelayConfig::default(), backend.clone(), Arc::new(NoPresence));
        (relay, backend, RecordingChannel::new())
    }

    fn from(name: &str, content: &str) -> InboundMessage {
        InboundMessage::new(Author::new(format!("id-{name}"), name), content)
    }

    #[tokio::test]
    async fn ai_command_runs_the_pipeline() {
        let (relay, backend, channel) = relay();
        let outcome = relay
            .handle_message(from("ada", "!ai hello"), Arc::new(channel.clone()))
            .await;
        assert!(outcome.unwrap().is_delivered());

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls[0].prompt, "hello");
        assert_eq!(calls[0].model, crate::DEFAULT_MODEL);
        assert!(
            channel
                .transcript()
                .last()
                .unwrap()
                .ends_with("A: echo hello")
        );
    }

    #[tokio::test]
    async fn config_overrides_reach_the_payload() {
        let (relay, backend, channel) = relay();
        let ch: Arc<dyn Channel> = Arc::new(channel.clone());

        relay
            .handle_message(from("ada", "!config llama3 0.2"), ch.clone())
            .await;
        assert_eq!(
            channel.transcript(),
            vec!["Configured: Model=llama3, Temperature=0.2"]
        );

        relay.handle_message(from("ada", "!ai hi"), ch.clone()).await;
        relay.handle_message(from("bob", "!ai hi"), ch).await;

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls[0].model, "llama3");
        assert!((calls[0].temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(calls[1].model, crate::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn bare_config_resets_to_command_defaults() {
        let (relay, _, channel) = relay();
        relay
            .handle_message(from("ada", "!config"), Arc::new(channel.clone()))
            .await;
        assert_eq!(
            channel.transcript(),
            vec!["Configured: Model=deepseek-r1-d-qwen-gguf:8b, Temperature=0.7"]
        );
    }

    #[tokio::test]
    async fn own_messages_and_chatter_are_ignored() {
        let (relay, backend, channel) = relay();
        let ch: Arc<dyn Channel> = Arc::new(channel.clone());
        assert!(relay.handle_message(from("thonk", "!ai loop"), ch.clone()).await.is_none());
        assert!(relay.handle_message(from("ada", "nice weather"), ch).await.is_none());
        assert!(backend.calls.lock().unwrap().is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn empty_prompt_gets_usage_without_spending_a_request() {
        let (relay, backend, channel) = relay();
        let outcome = relay
            .handle_message(from("ada", "!ai   "), Arc::new(channel.clone()))
            .await;
        assert!(outcome.is_none());
        assert_eq!(channel.transcript(), vec!["Usage: !ai <prompt>"]);
        assert!(backend.calls.lock().unwrap().is_empty());
        let user = "id-ada".into();
        assert_eq!(relay.orchestrator().gate().limiter().count(&user), 0);
    }

    #[tokio::test]
    async fn bad_config_arguments_get_usage() {
        let (relay, _, channel) = relay();
        relay
            .handle_message(from("ada", "!config llama3 hot"), Arc::new(channel.clone()))
            .await;
        assert!(channel.transcript()[0].starts_with("Usage: !config"));
        assert!(relay.settings().get(&"id-ada".into()).is_none());
    }

    #[tokio::test]
    async fn failures_come_back_as_outcomes() {
        let (relay, _, channel) = relay();
        let ch: Arc<dyn Channel> = Arc::new(channel.clone());
        let outcome = relay.handle_message(from("ada", "!ai fail"), ch.clone()).await;
        assert!(matches!(outcome, Some(Outcome::Failed(_))));

        for _ in 0..4 {
            relay.handle_message(from("ada", "!ai again"), ch.clone()).await;
        }
        let outcome = relay.handle_message(from("ada", "!ai again"), ch).await;
        assert!(matches!(
            outcome,
            Some(Outcome::Rejected(Rejection::RateLimited { .. }))
        ));
    }
}

//! Relay configuration and per-user settings.
//!
//! [`RelayConfig`] carries every tunable with defaults matching a local
//! Ollama deployment serving one DeepSeek distill. [`RelayConfig::from_env`]
//! overlays `THONK_*` environment variables; binaries then apply their CLI
//! flags on top.
//!
//! [`SettingsStore`] holds the per-user `model`/`temperature` overrides set
//! through the `config` chat command.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::warn;

use crate::pipeline::heartbeat::HeartbeatSchedule;
use crate::surface::UserId;
use crate::{DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Model stored by a bare `config` command.
pub const CONFIG_DEFAULT_MODEL: &str = "deepseek-r1-d-qwen-gguf:8b";

/// Temperature stored by a bare `config` command.
pub const CONFIG_DEFAULT_TEMPERATURE: f32 = 0.7;

/// Backend call budgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutConfig {
    /// Whole call, connection through last byte. Default: 1350 s.
    pub total: Duration,
    /// Establishing a new connection. Default: 10 s.
    pub connect: Duration,
    /// Waiting for any single read from the peer. Default: 900 s.
    pub read: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(1350),
            connect: Duration::from_secs(10),
            read: Duration::from_secs(900),
        }
    }
}

/// How the answer is posted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Completion banner, then one framed embed per 4000-char chunk.
    #[default]
    Framed,
    /// Completion banner, then raw 2000-char text messages with a pause
    /// between sends.
    Paced,
}

/// Top-level relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Generate endpoint URL.
    pub api_url: String,
    /// Optional bearer credential for the backend. Never logged.
    pub api_key: Option<String>,
    /// Model used when the user has no override.
    pub default_model: String,
    /// Temperature used when the user has no override.
    pub temperature: f32,
    pub timeouts: TimeoutConfig,
    pub heartbeat: HeartbeatSchedule,
    /// Highest per-user request count still admitted. Default: 5.
    pub rate_threshold: u32,
    /// Context window entries kept per user. Default: 5.
    pub context_capacity: usize,
    /// Chunk size for framed delivery. Default: 4000.
    pub chunk_limit: usize,
    /// Chunk size for paced delivery. Default: 2000.
    pub send_limit: usize,
    /// Pause between paced sends. Default: 2 s.
    pub pacing: Duration,
    pub delivery: DeliveryMode,
    /// Prefix that marks a chat message as a command. Default: `!`.
    pub command_prefix: String,
    /// Display name the relay uses for itself.
    pub bot_name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeouts: TimeoutConfig::default(),
            heartbeat: HeartbeatSchedule::default(),
            rate_threshold: 5,
            context_capacity: 5,
            chunk_limit: 4000,
            send_limit: 2000,
            pacing: Duration::from_secs(2),
            delivery: DeliveryMode::Framed,
            command_prefix: "!".to_string(),
            bot_name: "thonk".to_string(),
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with `THONK_*` environment variables.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("THONK_API_URL") {
            config.api_url = url;
        }
        if let Some(key) = lookup("THONK_API_KEY").filter(|k| !k.is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(model) = lookup("THONK_MODEL") {
            config.default_model = model;
        }
        if let Some(raw) = lookup("THONK_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(t) => config.temperature = t,
                Err(_) => warn!("Ignoring THONK_TEMPERATURE={raw:?}: not a number"),
            }
        }
        if let Some(raw) = lookup("THONK_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.timeouts.total = Duration::from_secs(secs),
                Err(_) => warn!("Ignoring THONK_TIMEOUT_SECS={raw:?}: not an integer"),
            }
        }
        if let Some(name) = lookup("THONK_BOT_NAME") {
            config.bot_name = name;
        }
        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_total_timeout(mut self, total: Duration) -> Self {
        self.timeouts.total = total;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = name.into();
        self
    }

    /// Settings for a user without overrides.
    pub fn default_settings(&self) -> UserSettings {
        UserSettings {
            model: self.default_model.clone(),
            temperature: self.temperature,
        }
    }
}

// ── Per-user settings ──────────────────────────────────────────────

/// A user's generation overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub model: String,
    pub temperature: f32,
}

/// Per-user overrides set through the `config` command.
///
/// Read by the generation pipeline and written by the command handler, which
/// can run while a generation is in flight, hence the lock.
#[derive(Debug, Default)]
pub struct SettingsStore {
    inner: Mutex<HashMap<UserId, UserSettings>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store overrides for `user`. Omitted values fall back to the
    /// command defaults, not to the previous override.
    pub fn configure(
        &self,
        user: &UserId,
        model: Option<String>,
        temperature: Option<f32>,
    ) -> UserSettings {
        let settings = UserSettings {
            model: model.unwrap_or_else(|| CONFIG_DEFAULT_MODEL.to_string()),
            temperature: temperature.unwrap_or(CONFIG_DEFAULT_TEMPERATURE),
        };
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.clone(), settings.clone());
        settings
    }

    /// The user's overrides, if any were stored.
    pub fn get(&self, user: &UserId) -> Option<UserSettings> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .cloned()
    }

    /// The user's overrides, or `fallback` when none were stored.
    pub fn resolve(&self, user: &UserId, fallback: &UserSettings) -> UserSettings {
        self.get(user).unwrap_or_else(|| fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_deployment() {
        let config = RelayConfig::default();
        assert_eq!(config.api_url, "http://localhost:42069/api/generate");
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeouts.total, Duration::from_secs(1350));
        assert_eq!(config.timeouts.connect, Duration::from_secs(10));
        assert_eq!(config.timeouts.read, Duration::from_secs(900));
        assert_eq!(config.rate_threshold, 5);
        assert_eq!(config.context_capacity, 5);
        assert_eq!(config.chunk_limit, 4000);
        assert_eq!(config.send_limit, 2000);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn env_overlay_applies_known_keys() {
        let config = RelayConfig::from_lookup(|key| match key {
            "THONK_API_URL" => Some("http://gpu-box:11434/api/generate".into()),
            "THONK_MODEL" => Some("llama3".into()),
            "THONK_TEMPERATURE" => Some("0.2".into()),
            "THONK_TIMEOUT_SECS" => Some("600".into()),
            "THONK_API_KEY" => Some("k".into()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://gpu-box:11434/api/generate");
        assert_eq!(config.default_model, "llama3");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.timeouts.total, Duration::from_secs(600));
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn env_overlay_ignores_garbage_numbers() {
        let config = RelayConfig::from_lookup(|key| match key {
            "THONK_TEMPERATURE" => Some("warm".into()),
            "THONK_TIMEOUT_SECS" => Some("-1".into()),
            "THONK_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeouts.total, Duration::from_secs(1350));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn configure_fills_command_defaults() {
        let store = SettingsStore::new();
        let user = UserId::from("u1");
        let s = store.configure(&user, None, None);
        assert_eq!(s.model, CONFIG_DEFAULT_MODEL);
        assert!((s.temperature - CONFIG_DEFAULT_TEMPERATURE).abs() < f32::EPSILON);

        let s = store.configure(&user, Some("llama3".into()), Some(0.0));
        assert_eq!(s.model, "llama3");
        assert_eq!(s.temperature, 0.0);
        assert_eq!(store.get(&user), Some(s));
    }

    #[test]
    fn resolve_falls_back_for_unknown_users() {
        let config = RelayConfig::default();
        let store = SettingsStore::new();
        let fallback = config.default_settings();
        assert_eq!(store.resolve(&UserId::from("nobody"), &fallback), fallback);
    }
}

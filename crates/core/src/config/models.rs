//! Controller configuration.
//!
//! The operator-facing knobs are the action cooldown and the reconnect
//! delay; both default to the named constants below. Endpoints and the
//! extra agent-type mappings round out the file.

use crate::progress::channel::ChannelSettings;
use af_protocol::progress_models::Verbosity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Cooldown of the completion action gate.
pub const DEFAULT_ACTION_COOLDOWN: Duration = Duration::from_millis(300);

/// Delay before the progress channel reconnects after a close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Upper bound for the reconnect delay when backoff is enabled.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Pause after writing the cross-reference record so readers can see it.
pub const DEFAULT_RECORD_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Timeout of the execute request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PROGRESS_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_CLIENT_ID: &str = "agentflow";

/// Timing settings, in the units used by the config file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub action_cooldown_ms: u64,
    pub reconnect_delay_ms: u64,

    /// Double the reconnect delay after each failed attempt.
    pub reconnect_backoff: bool,

    pub max_reconnect_delay_ms: u64,
    pub record_settle_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_cooldown_ms: DEFAULT_ACTION_COOLDOWN.as_millis() as u64,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            reconnect_backoff: false,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY.as_millis() as u64,
            record_settle_delay_ms: DEFAULT_RECORD_SETTLE_DELAY.as_millis() as u64,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl TimingConfig {
    pub fn action_cooldown(&self) -> Duration {
        Duration::from_millis(self.action_cooldown_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn record_settle_delay(&self) -> Duration {
        Duration::from_millis(self.record_settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings loaded from `.agentflow/config.toml`.
///
/// # Example
///
/// ```toml
/// api_base_url = "https://api.example.com"
/// progress_url = "wss://api.example.com/ws"
/// client_id = "classroom-app"
/// verbosity = "verbose"
///
/// [timing]
/// action_cooldown_ms = 300
/// reconnect_delay_ms = 2000
/// reconnect_backoff = true
///
/// [executions]
/// mind_map = "generate_mind_map"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL of the remote execution API.
    pub api_base_url: String,

    /// Base URL of the progress channel.
    pub progress_url: String,

    /// Caller identity sent when opening the progress channel.
    pub client_id: String,

    pub verbosity: Verbosity,

    /// Bearer token for the execution API.
    pub auth_token: Option<String>,

    pub timing: TimingConfig,

    /// Agent type to remote execution identifier entries, merged over the
    /// built-in table.
    pub executions: BTreeMap<String, String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            progress_url: DEFAULT_PROGRESS_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            verbosity: Verbosity::default(),
            auth_token: None,
            timing: TimingConfig::default(),
            executions: BTreeMap::new(),
        }
    }
}

impl ControllerConfig {
    /// Progress channel settings derived from the timing section.
    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            verbosity: self.verbosity,
            reconnect_delay: self.timing.reconnect_delay(),
            backoff: self.timing.reconnect_backoff,
            max_reconnect_delay: self.timing.max_reconnect_delay(),
        }
    }

    /// Check values that would make the controller misbehave.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            ));
        }
        if !(self.progress_url.starts_with("ws://") || self.progress_url.starts_with("wss://")) {
            return Err(format!(
                "progress_url must be a ws(s) URL, got '{}'",
                self.progress_url
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err("client_id must not be empty".to_string());
        }
        if self.timing.action_cooldown_ms == 0 {
            return Err("timing.action_cooldown_ms must be greater than zero".to_string());
        }
        if self.timing.reconnect_delay_ms == 0 {
            return Err("timing.reconnect_delay_ms must be greater than zero".to_string());
        }
        if self.timing.max_reconnect_delay_ms < self.timing.reconnect_delay_ms {
            return Err(
                "timing.max_reconnect_delay_ms must not be below timing.reconnect_delay_ms"
                    .to_string(),
            );
        }
        if let Some((agent_type, _)) = self
            .executions
            .iter()
            .find(|(_, identifier)| identifier.trim().is_empty())
        {
            return Err(format!(
                "executions.{agent_type} must name a remote execution identifier"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.timing.action_cooldown(), DEFAULT_ACTION_COOLDOWN);
        assert_eq!(config.timing.reconnect_delay(), DEFAULT_RECONNECT_DELAY);
        assert_eq!(config.timing.record_settle_delay(), DEFAULT_RECORD_SETTLE_DELAY);
        assert_eq!(config.timing.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channel_settings_from_timing() {
        let mut config = ControllerConfig::default();
        config.timing.reconnect_delay_ms = 750;
        config.timing.reconnect_backoff = true;
        config.verbosity = Verbosity::Verbose;

        let settings = config.channel_settings();
        assert_eq!(settings.reconnect_delay, Duration::from_millis(750));
        assert!(settings.backoff);
        assert_eq!(settings.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ControllerConfig::default();
        config.progress_url = "http://not-a-socket".to_string();
        assert!(config.validate().unwrap_err().contains("progress_url"));

        let mut config = ControllerConfig::default();
        config.timing.action_cooldown_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.timing.max_reconnect_delay_ms = 10;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config
            .executions
            .insert("quiz".to_string(), "  ".to_string());
        assert!(config.validate().unwrap_err().contains("executions.quiz"));
    }
}

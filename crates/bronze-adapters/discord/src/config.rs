//! Discord adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bronze_core::RetryConfig;
use bronze_core::transport::humantime_serde;
use bronze_framework::DEFAULT_CALL_PREFIX;

/// Configuration for one Discord bot.
///
/// ```toml
/// [[bots]]
/// id = "main"
/// platform = "discord"
/// token = "…"
/// call_prefix = "!"
/// close_timeout = "5s"
///
/// [bots.retry]
/// max_retries = 5
/// initial_delay = "1s"
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token used for identify and REST authorization.
    pub token: String,

    /// Prefix recognised for text commands.
    #[serde(default = "default_call_prefix")]
    pub call_prefix: String,

    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// How long shutdown waits for the receive loop after sending close.
    #[serde(with = "humantime_serde", default = "default_close_timeout")]
    pub close_timeout: Duration,

    /// REST request timeout.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Backoff for re-dialing after going-away closes and failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_call_prefix() -> String {
    DEFAULT_CALL_PREFIX.to_string()
}

fn default_api_url() -> String {
    "https://discord.com/api".to_string()
}

fn default_close_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl DiscordConfig {
    /// Creates a configuration with defaults for everything but the token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            call_prefix: default_call_prefix(),
            api_url: default_api_url(),
            close_timeout: default_close_timeout(),
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the command prefix.
    pub fn with_call_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.call_prefix = prefix.into();
        self
    }

    /// Sets the redial backoff.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("call_prefix", &self.call_prefix)
            .field("api_url", &self.api_url)
            .field("close_timeout", &self.close_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: DiscordConfig = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(config.call_prefix, "!");
        assert_eq!(config.api_url, "https://discord.com/api");
        assert_eq!(config.close_timeout, Duration::from_secs(5));
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn durations_accept_human_units() {
        let config: DiscordConfig = serde_json::from_str(
            r#"{"token":"abc","close_timeout":"250ms","retry":{"initial_delay":"2s"}}"#,
        )
        .unwrap();
        assert_eq!(config.close_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", DiscordConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}

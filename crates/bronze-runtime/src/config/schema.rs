//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! bronze_transport = "trace"
//!
//! [runtime]
//! restart_on_failure = true
//! restart_delay = "10s"
//!
//! [[bots]]
//! id = "main"
//!
//! [bots.platform]
//! type = "discord"
//! token = "…"
//! call_prefix = "!"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use bronze_adapter_discord::DiscordConfig;
use bronze_core::transport::humantime_serde;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BronzeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl BronzeConfig {
    /// Bots with `enabled = true`.
    pub fn enabled_bots(&self) -> impl Iterator<Item = &BotConfig> {
        self.bots.iter().filter(|bot| bot.enabled)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation policy for file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file path, required for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: FileRotation,

    /// Rotated files to keep; `0` keeps all.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Per-target levels, e.g. `bronze_transport = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

fn default_max_files() -> usize {
    5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: FileRotation::default(),
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// What the runtime does when a bot fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Restart a bot whose run ended with an error.
    #[serde(default)]
    pub restart_on_failure: bool,

    /// Pause before such a restart.
    #[serde(with = "humantime_serde", default = "default_restart_delay")]
    pub restart_delay: Duration,
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(5)
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            restart_on_failure: false,
            restart_delay: default_restart_delay(),
        }
    }
}

// =============================================================================
// Bots
// =============================================================================

/// One configured bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Unique identifier, used in logs.
    pub id: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub platform: PlatformConfig,
}

fn default_enabled() -> bool {
    true
}

/// Platform-specific settings, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlatformConfig {
    Discord(DiscordConfig),
}

impl PlatformConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discord(_) => bronze_adapter_discord::PLATFORM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bots_deserialize_with_platform_tag() {
        let config: BronzeConfig = serde_json::from_str(
            r#"{
                "bots": [{
                    "id": "main",
                    "platform": {"type": "discord", "token": "abc", "call_prefix": "?"}
                }]
            }"#,
        )
        .unwrap();

        let bot = &config.bots[0];
        assert!(bot.enabled);
        assert_eq!(bot.platform.name(), "discord");
        let PlatformConfig::Discord(discord) = &bot.platform;
        assert_eq!(discord.call_prefix, "?");
    }

    #[test]
    fn logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.output, LogOutput::Stdout);
        assert_eq!(config.max_files, 5);
    }

    #[test]
    fn runtime_settings_parse_delay() {
        let settings: RuntimeSettings =
            serde_json::from_str(r#"{"restart_on_failure":true,"restart_delay":"750ms"}"#)
                .unwrap();
        assert!(settings.restart_on_failure);
        assert_eq!(settings.restart_delay, Duration::from_millis(750));
    }

    #[test]
    fn disabled_bots_are_skipped() {
        let mut config = BronzeConfig::default();
        for (id, enabled) in [("a", true), ("b", false)] {
            config.bots.push(BotConfig {
                id: id.into(),
                enabled,
                platform: PlatformConfig::Discord(DiscordConfig::new("t")),
            });
        }
        let ids: Vec<_> = config.enabled_bots().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
    }
}

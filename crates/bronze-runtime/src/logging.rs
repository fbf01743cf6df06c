//! Log subscriber setup.
//!
//! Everything in Bronze logs through `tracing`. This module installs the
//! global subscriber from a [`LoggingConfig`]:
//!
//! ```rust,ignore
//! use bronze_runtime::logging;
//!
//! logging::init_from_config(&config.logging)?;
//! ```
//!
//! or by hand:
//!
//! ```rust,ignore
//! use bronze_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("bronze_adapter_discord=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```
//!
//! `RUST_LOG`, when set, replaces the configured base level; configured
//! per-target filters are still added on top.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{FileRotation, LogFormat, LogOutput, LoggingConfig, SpanEventConfig};
use crate::error::{RuntimeError, RuntimeResult};

const DEFAULT_LOG_FILE: &str = "bronze.log";

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only; shows how long each bot span lived.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(FmtSpan::NONE, |acc, (_, flag)| acc | flag)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Never => Rotation::NEVER,
            FileRotation::Minutely => Rotation::MINUTELY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Daily => Rotation::DAILY,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_from_config(config: &LoggingConfig) -> RuntimeResult<bool> {
    LoggingBuilder::from_config(config).try_init()
}

/// Builder for the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_file_location: bool,
    file_path: Option<PathBuf>,
    rotation: FileRotation,
    max_files: usize,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            with_file_location: false,
            file_path: None,
            rotation: FileRotation::Never,
            max_files: 5,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut directives: Vec<String> = config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .collect();
        directives.sort();

        Self {
            level: config.level.to_tracing_level(),
            directives,
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            with_target: true,
            with_thread_ids: config.thread_ids,
            with_file_location: config.file_location,
            file_path: config.file_path.clone(),
            rotation: config.rotation,
            max_files: config.max_files,
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `"bronze_transport=trace"`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Include source file and line number.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.with_file_location = enabled;
        self
    }

    /// Log to a file, rotated as configured.
    pub fn file(mut self, path: impl Into<PathBuf>, rotation: FileRotation) -> Self {
        self.output = LogOutput::File;
        self.file_path = Some(path.into());
        self.rotation = rotation;
        self
    }

    pub fn max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    /// The effective filter; invalid directives are skipped.
    pub fn build_filter(&self) -> EnvFilter {
        let base = self.level.as_str().to_lowercase();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        self.directives
            .iter()
            .filter_map(|directive| directive.parse().ok())
            .fold(filter, EnvFilter::add_directive)
    }

    fn file_appender(&self) -> RuntimeResult<RollingFileAppender> {
        let path = self
            .file_path
            .as_deref()
            .ok_or_else(|| RuntimeError::Logging("file output needs a file path".into()))?;
        let directory = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let prefix = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);

        let mut builder = RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(prefix);
        if self.max_files > 0 && self.rotation != FileRotation::Never {
            builder = builder.max_log_files(self.max_files);
        }
        builder
            .build(directory)
            .map_err(|e| RuntimeError::Logging(e.to_string()))
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// Returns `Ok(false)` when another subscriber is already installed and
    /// an error when the log file cannot be opened.
    pub fn try_init(self) -> RuntimeResult<bool> {
        let filter = self.build_filter();
        let span_events = self.span_events.to_fmt_span();

        macro_rules! decorate {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events.clone())
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids)
                    .with_file(self.with_file_location)
                    .with_line_number(self.with_file_location)
            };
        }

        macro_rules! install {
            ($writer:expr) => {{
                let registry = tracing_subscriber::registry().with(filter);
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => registry
                        .with(decorate!(fmt::layer().json().with_writer($writer)))
                        .try_init(),
                    LogFormat::Compact => registry
                        .with(decorate!(fmt::layer().compact().with_writer($writer)))
                        .try_init(),
                    LogFormat::Pretty => registry
                        .with(decorate!(fmt::layer().pretty().with_writer($writer)))
                        .try_init(),
                    _ => registry
                        .with(decorate!(fmt::layer().with_writer($writer)))
                        .try_init(),
                }
            }};
        }

        let installed = match self.output {
            LogOutput::Stdout => install!(std::io::stdout),
            LogOutput::Stderr => install!(std::io::stderr),
            LogOutput::File => {
                let appender = self.file_appender()?;
                install!(appender)
            }
        };
        Ok(installed.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn span_events_map_to_fmt_flags() {
        assert_eq!(SpanEvents::NONE.to_fmt_span(), FmtSpan::NONE);
        assert_eq!(SpanEvents::FULL.to_fmt_span(), FmtSpan::FULL);
        assert_eq!(
            SpanEvents::LIFECYCLE.to_fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
    }

    #[test]
    fn config_filters_become_sorted_directives() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filters: HashMap::from([
                ("bronze_transport".to_string(), LogLevel::Trace),
                ("bronze_adapter_discord".to_string(), LogLevel::Debug),
            ]),
            ..Default::default()
        };

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::WARN);
        assert_eq!(
            builder.directives,
            [
                "bronze_adapter_discord=debug",
                "bronze_transport=trace"
            ]
        );
    }

    #[test]
    fn file_output_without_path_is_an_error() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        assert!(matches!(
            builder.file_appender(),
            Err(RuntimeError::Logging(_))
        ));
    }
}

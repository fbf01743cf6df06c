//! Configuration for the Bronze runtime.
//!
//! Loaded with figment from TOML (or YAML) files and `BRONZE_*` environment
//! variables, then validated before any bot is created.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, BronzeConfig, FileRotation, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PlatformConfig, RuntimeSettings, SpanEventConfig,
};
pub use validation::validate_config;

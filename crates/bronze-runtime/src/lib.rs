//! Bronze Runtime - orchestration layer for Bronze bots.
//!
//! This crate provides:
//! - Layered configuration (`BronzeConfig`, `ConfigLoader`)
//! - Logging setup from configuration (`LoggingBuilder`)
//! - Bot supervision with restart-on-failure (`BronzeRuntime`)
//!
//! ```ignore
//! use bronze_runtime::BronzeRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BronzeRuntime::builder().build()?;
//!     runtime.connect_bots(|_, bot| bot.add_plugin(MyPlugin)).await?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    BotConfig, BronzeConfig, ConfigError, ConfigLoader, ConfigResult, PlatformConfig,
    RuntimeSettings, load_config, load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BronzeRuntime, RuntimeBuilder, wait_for_shutdown};

pub use tracing;
pub use tracing_subscriber;

pub mod prelude {
    pub use crate::config::{BronzeConfig, ConfigLoader, load_config};
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::logging::LoggingBuilder;
    pub use crate::runtime::BronzeRuntime;
}

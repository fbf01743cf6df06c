//! # Bronze
//!
//! A supervised, plugin-driven chat-bot runtime for Discord-style gateways.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────────────────┐     ┌────────────┐
//! │ BronzeRuntime │────▶│ DiscordBot (supervisor)  │────▶│ HookRouter │──▶ Plugin "echo"
//! │ (config, logs │     │ dial · hello · identify  │     │            │──▶ Plugin …
//! │  restarts)    │     │ heartbeat · recover      │     └────────────┘
//! └───────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, installs logging, runs every bot
//! - **Adapter**: owns one gateway connection and keeps it alive
//! - **Framework**: routes posts, commands and reactions to plugins
//! - **Plugins**: user code reacting to hooks through a [`PluginApi`](framework::PluginApi)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bronze::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BronzeRuntime::builder().build()?;
//!     runtime.connect_bots(|_, bot| bot.add_plugin(MyPlugin::default())).await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub use bronze_adapter_discord as discord;
pub use bronze_core as core;
pub use bronze_framework as framework;
pub use bronze_runtime as runtime;

/// Everything a bot binary usually needs.
///
/// ```rust,ignore
/// use bronze::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use bronze_runtime::{BronzeConfig, BronzeRuntime, RuntimeError, RuntimeResult};

    // Plugins
    pub use bronze_framework::{Plugin, PluginApi};
    pub use bronze_framework::prelude::async_trait;

    // Data passed to hooks
    pub use bronze_core::{
        ApiError, Bot, HookError, HookResult, MessageIdentifier, Post, Reaction, User,
    };

    // Discord
    pub use bronze_adapter_discord::{DiscordBot, DiscordConfig, GatewayState};
}

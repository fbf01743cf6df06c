//! # Discord Adapter for Bronze
//!
//! Connects a bot to the Discord gateway and exposes the Discord REST API as
//! a [`ChatApi`](bronze_core::ChatApi).
//!
//! ## Gateway lifecycle
//!
//! ```text
//! GET /gateway ─▶ dial ─▶ hello ─▶ identify ─▶ READY ─▶ dispatch …
//!                           │                     │
//!                           └─ heartbeat task     └─ on_run (once)
//!                              + watchdog (2× interval)
//! ```
//!
//! A close with code 1001 re-dials the same address; a missed heartbeat
//! acknowledgement or a read error resolves the gateway again and starts
//! over with a fresh session. An invalid session ends the run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bronze_adapter_discord::{DiscordBot, DiscordConfig};
//!
//! let bot = DiscordBot::from_config("main", DiscordConfig::new(token)).await?;
//! bot.add_plugin(MyPlugin::default());
//! ```

pub mod config;
pub mod event;
pub mod gateway;
pub mod heartbeat;
pub mod protocol;
pub mod registry;
pub mod rest;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::DiscordConfig;
pub use event::{DomainEvent, decode_event};
pub use gateway::{DiscordBot, PLATFORM};
pub use rest::DiscordRestClient;
pub use session::GatewayState;

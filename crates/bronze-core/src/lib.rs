//! # Bronze Core
//!
//! Platform-neutral building blocks for the Bronze chat-bot runtime.
//!
//! This crate holds the contracts that every other layer agrees on:
//!
//! - **Transport**: the connection capability a gateway session drives
//!   ([`Transport`], [`Frame`], [`CloseCode`])
//! - **Chat API**: outbound actions and gateway discovery ([`ChatApi`],
//!   [`GatewayResolver`])
//! - **Domain model**: the values handed to plugins ([`Post`], [`Reaction`],
//!   [`User`], [`Channel`])
//! - **Watchdog**: a dead-man's switch used for liveness detection
//!   ([`Watchdog`])
//! - **Bot**: the unit the runtime supervises ([`Bot`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐   frames   ┌─────────────┐   events   ┌──────────┐
//! │ Transport │──────────▶│   Gateway   │──────────▶│  Plugins │
//! └───────────┘            │ (lifecycle) │            └────┬─────┘
//!                          └─────────────┘                 │
//!                   ┌───────────┐        actions           │
//!                   │  ChatApi  │◀─────────────────────────┘
//!                   └───────────┘
//! ```
//!
//! Plugins never see the transport; everything they send goes through
//! [`ChatApi`].

pub mod api;
pub mod bot;
pub mod error;
pub mod model;
pub mod transport;
pub mod watchdog;

pub use api::{BoxedChatApi, BoxedResolver, ChatApi, GatewayResolver};
pub use bot::{Bot, BotInfo, BoxedBot};
pub use error::{
    ApiError, ApiResult, GatewayError, GatewayResult, HookError, HookResult, TransportError,
    TransportResult,
};
pub use model::{Channel, MessageIdentifier, Post, PostResponse, Reaction, User};
pub use transport::{BoxedTransport, CloseCode, Frame, FrameType, RetryConfig, Transport};
pub use watchdog::Watchdog;

/// Prelude for common imports.
pub mod prelude {
    pub use super::api::{ChatApi, GatewayResolver};
    pub use super::bot::Bot;
    pub use super::error::{ApiError, ApiResult, HookError, HookResult};
    pub use super::model::*;
}

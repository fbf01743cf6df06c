//! # Bronze Transport
//!
//! Network implementations of the contracts defined in `bronze-core`.
//!
//! ## Features
//!
//! - `ws-client`: [`WsTransport`], a WebSocket [`Transport`](bronze_core::Transport)
//! - `http-client`: [`HttpClient`], a JSON REST helper used by platform API clients
//! - `full`: all of the above
//!
//! ## Where it sits
//!
//! ```text
//!   DiscordBot ──Transport──▶ WsTransport ──▶ wss://gateway
//!        │
//!        └──ChatApi──▶ DiscordRestClient ──HttpClient──▶ https://api
//! ```
//!
//! Adapters only see the traits; this crate is the only one that links
//! `tokio-tungstenite` and `reqwest`.

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "http-client")]
pub use http::HttpClient;

#[cfg(feature = "ws-client")]
pub use websocket::WsTransport;

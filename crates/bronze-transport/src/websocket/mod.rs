//! WebSocket transport.

mod client;
pub use client::WsTransport;

//! The supervised bot contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayResult;

/// A snapshot of a bot's state for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotInfo {
    /// Platform name, e.g. `"discord"`.
    pub platform: &'static str,
    /// Current connection state, rendered for humans.
    pub state: String,
    /// Whether the bot is in its steady state.
    pub healthy: bool,
    /// Number of registered plugins.
    pub plugin_count: usize,
}

/// A long-running bot connected to one platform.
///
/// `run` owns the whole connection lifecycle. It returns `Ok(())` after an
/// orderly shutdown (cancellation or a normal remote close) and an error
/// only when the session cannot be recovered.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Configured bot identifier.
    fn id(&self) -> &str;

    /// Current status snapshot.
    fn info(&self) -> BotInfo;

    /// Runs until `cancel` fires or a fatal error occurs.
    async fn run(&self, cancel: CancellationToken) -> GatewayResult<()>;
}

/// Shared bot handle.
pub type BoxedBot = Arc<dyn Bot>;

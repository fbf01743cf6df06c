//! Runtime error types.

use thiserror::Error;

use bronze_core::GatewayError;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors raised by the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The log subscriber could not be set up.
    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    /// A bot failed to connect or ended with an unrecoverable error.
    #[error("Bot {id} failed: {source}")]
    Bot {
        id: String,
        #[source]
        source: GatewayError,
    },

    #[error("Bot already exists: {0}")]
    BotExists(String),

    #[error("No bots to run")]
    NoBots,
}

impl RuntimeError {
    pub fn bot(id: impl Into<String>, source: GatewayError) -> Self {
        Self::Bot {
            id: id.into(),
            source,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

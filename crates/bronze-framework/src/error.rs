//! Error types for the Bronze framework.

use thiserror::Error;

/// Errors returned by command registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Command names must not be empty.
    #[error("command name must not be empty")]
    EmptyName,

    /// The plugin that owns the API handle has been dropped.
    #[error("plugin is no longer registered")]
    PluginGone,
}

/// Result type for command registration.
pub type CommandResult<T> = Result<T, CommandError>;

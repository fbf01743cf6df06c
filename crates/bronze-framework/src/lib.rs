//! # Bronze Framework
//!
//! Plugin-facing layer of the Bronze chat-bot runtime.
//!
//! - [`Plugin`]: the fixed hook contract (`on_run`, `on_stop`, `on_post`,
//!   `on_command`, `on_reaction_added`, `on_reaction_removed`)
//! - [`PluginApi`]: what a plugin can do (post, look up, register commands,
//!   log)
//! - [`CommandDispatcher`]: prefix command parsing and the `help` listing
//! - [`HookRouter`]: ordered, error-isolated broadcast of events to plugins
//!
//! ```text
//!              ┌────────────┐  on_post (all plugins, in order)
//!   Post ────▶│ HookRouter │─────────────────────────────────▶ Plugin …
//!              └─────┬──────┘
//!                    │ dispatch
//!              ┌─────▼─────────────┐  on_command (one receiver)
//!              │ CommandDispatcher │───────────────────────────▶ Plugin
//!              └───────────────────┘
//! ```

pub mod api;
pub mod command;
pub mod error;
pub mod plugin;
pub mod router;

pub use api::PluginApi;
pub use command::{
    CommandDispatcher, CommandReceiver, DEFAULT_CALL_PREFIX, Dispatch, HELP_COMMAND,
    ParsedCommand,
};
pub use error::{CommandError, CommandResult};
pub use plugin::Plugin;
pub use router::HookRouter;

/// Prelude for plugin authors.
pub mod prelude {
    pub use super::api::PluginApi;
    pub use super::plugin::Plugin;
    pub use async_trait::async_trait;
    pub use bronze_core::prelude::*;
}

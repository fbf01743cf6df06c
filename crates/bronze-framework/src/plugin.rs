//! The plugin hook contract.
//!
//! A plugin is a set of optional hooks. Every hook has a no-op default, so a
//! plugin only implements what it cares about:
//!
//! ```rust,ignore
//! struct Greeter { api: Option<PluginApi> }
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!
//!     fn attach(&mut self, api: PluginApi) {
//!         api.register_command("hello").ok();
//!         self.api = Some(api);
//!     }
//!
//!     async fn on_command(&self, _cmd: &str, _content: &str, post: Post) -> HookResult {
//!         if let Some(api) = &self.api {
//!             api.create_post(post.reply(format!("Hello, {}!", post.user))).await?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Hooks run sequentially on the bot's receive loop, in registration order.
//! A hook that returns an error is logged and skipped; delivery continues.

use async_trait::async_trait;

use bronze_core::{HookResult, Post, Reaction};

use crate::api::PluginApi;

/// A bot plugin.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Hands the plugin its API handle. Called once, at registration, before
    /// any hook runs.
    fn attach(&mut self, api: PluginApi) {
        let _ = api;
    }

    /// The bot reached its steady state for the first time.
    async fn on_run(&self) -> HookResult {
        Ok(())
    }

    /// The bot is shutting down.
    async fn on_stop(&self) -> HookResult {
        Ok(())
    }

    /// A message was received (including command-shaped messages).
    async fn on_post(&self, _post: Post) -> HookResult {
        Ok(())
    }

    /// A command registered by this plugin was invoked.
    async fn on_command(&self, _command: &str, _content: &str, _post: Post) -> HookResult {
        Ok(())
    }

    /// A reaction was added to a message.
    async fn on_reaction_added(&self, _reaction: Reaction) -> HookResult {
        Ok(())
    }

    /// A reaction was removed from a message.
    async fn on_reaction_removed(&self, _reaction: Reaction) -> HookResult {
        Ok(())
    }
}

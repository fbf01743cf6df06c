//! The API handle given to each plugin.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use bronze_core::{
    ApiResult, BoxedChatApi, Channel, HookResult, MessageIdentifier, Post, PostResponse, User,
};

use crate::command::{CommandDispatcher, CommandReceiver};
use crate::error::{CommandError, CommandResult};
use crate::plugin::Plugin;

/// Per-plugin access to outbound actions, command registration and logging.
///
/// Cloning is cheap. The handle holds only a weak reference to its plugin,
/// so commands registered through it stop resolving once the plugin is gone.
#[derive(Clone)]
pub struct PluginApi {
    plugin_name: Arc<str>,
    plugin: Weak<dyn Plugin>,
    chat: BoxedChatApi,
    commands: Arc<CommandDispatcher>,
}

impl PluginApi {
    pub(crate) fn new(
        plugin_name: &str,
        plugin: Weak<dyn Plugin>,
        chat: BoxedChatApi,
        commands: Arc<CommandDispatcher>,
    ) -> Self {
        Self {
            plugin_name: Arc::from(plugin_name),
            plugin,
            chat,
            commands,
        }
    }

    /// Name of the plugin this handle belongs to.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    // ─── Commands ───────────────────────────────────────────────────────────

    /// Routes `command` to this plugin's [`Plugin::on_command`].
    pub fn register_command(&self, command: impl Into<String>) -> CommandResult<()> {
        let receiver = PluginReceiver {
            name: Arc::clone(&self.plugin_name),
            plugin: self.plugin.clone(),
        };
        self.commands.register(command, Arc::new(receiver))
    }

    /// Removes a command registration.
    pub fn unregister_command(&self, command: &str) {
        self.commands.unregister(command);
    }

    /// The call prefix commands are recognised with.
    pub fn call_prefix(&self) -> &str {
        self.commands.call_prefix()
    }

    // ─── Posts ──────────────────────────────────────────────────────────────

    pub async fn create_post(&self, post: Post) -> ApiResult<PostResponse> {
        self.chat.create_post(post).await
    }

    pub async fn update_post(&self, id: &MessageIdentifier, post: Post) -> ApiResult<PostResponse> {
        self.chat.update_post(id, post).await
    }

    pub async fn delete_post(&self, id: &MessageIdentifier) -> ApiResult<PostResponse> {
        self.chat.delete_post(id).await
    }

    pub async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        self.chat.get_user(user_id).await
    }

    pub async fn get_channel(&self, channel_id: &str) -> ApiResult<Channel> {
        self.chat.get_channel(channel_id).await
    }

    // ─── Logging ────────────────────────────────────────────────────────────

    pub fn log_trace(&self, msg: &str) {
        trace!(plugin = %self.plugin_name, "{msg}");
    }

    pub fn log_debug(&self, msg: &str) {
        debug!(plugin = %self.plugin_name, "{msg}");
    }

    pub fn log_info(&self, msg: &str) {
        info!(plugin = %self.plugin_name, "{msg}");
    }

    pub fn log_warn(&self, msg: &str) {
        warn!(plugin = %self.plugin_name, "{msg}");
    }

    pub fn log_error(&self, msg: &str) {
        error!(plugin = %self.plugin_name, "{msg}");
    }

    /// Version of the running framework.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

impl std::fmt::Debug for PluginApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginApi")
            .field("plugin", &self.plugin_name)
            .finish_non_exhaustive()
    }
}

/// Forwards dispatched commands to a plugin.
struct PluginReceiver {
    name: Arc<str>,
    plugin: Weak<dyn Plugin>,
}

#[async_trait]
impl CommandReceiver for PluginReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_command(&self, command: &str, content: &str, post: Post) -> HookResult {
        match self.plugin.upgrade() {
            Some(plugin) => plugin.on_command(command, content, post).await,
            None => Err(CommandError::PluginGone.into()),
        }
    }
}

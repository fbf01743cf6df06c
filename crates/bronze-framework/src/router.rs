//! Fan-out of domain events to plugins.
//!
//! [`HookRouter`] owns the ordered plugin list and the command dispatcher of
//! one bot. For every event it:
//!
//! - snapshots the plugin list, so registration never blocks delivery;
//! - invokes the matching hook on **every** plugin, sequentially, in
//!   registration order, each with its own copy of the payload;
//! - logs hook errors with the plugin name and keeps going.
//!
//! Posts additionally go through command dispatch after the `on_post`
//! broadcast, so a command-shaped post reaches both hooks.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use bronze_core::{BoxedChatApi, HookResult, Post, Reaction};

use crate::api::PluginApi;
use crate::command::{CommandDispatcher, Dispatch};
use crate::plugin::Plugin;

/// Routes events to the plugins of one bot.
pub struct HookRouter {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    commands: Arc<CommandDispatcher>,
    chat: BoxedChatApi,
}

impl HookRouter {
    /// Creates a router posting through `chat` and recognising commands
    /// with `call_prefix`.
    pub fn new(chat: BoxedChatApi, call_prefix: impl Into<String>) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            commands: Arc::new(CommandDispatcher::new(call_prefix)),
            chat,
        }
    }

    /// Registers a plugin and hands it its [`PluginApi`].
    pub fn add_plugin<P: Plugin>(&self, plugin: P) {
        let chat = Arc::clone(&self.chat);
        let commands = Arc::clone(&self.commands);

        let plugin: Arc<dyn Plugin> = Arc::new_cyclic(|weak: &std::sync::Weak<P>| {
            let mut plugin = plugin;
            let api = PluginApi::new(plugin.name(), weak.clone(), chat, commands);
            plugin.attach(api);
            plugin
        });

        info!(plugin = %plugin.name(), "Plugin registered");
        self.plugins.write().push(plugin);
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    /// The bot's command dispatcher.
    pub fn commands(&self) -> &Arc<CommandDispatcher> {
        &self.commands
    }

    fn snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().clone()
    }

    async fn broadcast<F, Fut>(&self, hook: &'static str, call: F)
    where
        F: Fn(Arc<dyn Plugin>) -> Fut,
        Fut: Future<Output = HookResult>,
    {
        for plugin in self.snapshot() {
            let name = plugin.name().to_string();
            if let Err(e) = call(plugin).await {
                error!(plugin = %name, hook, error = %e, "Plugin hook failed");
            }
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Broadcasts `on_run`.
    pub async fn run(&self) {
        debug!(plugins = self.plugin_count(), "Starting plugins");
        self.broadcast("on_run", |plugin| async move { plugin.on_run().await })
            .await;
    }

    /// Broadcasts `on_stop`.
    pub async fn stop(&self) {
        debug!(plugins = self.plugin_count(), "Stopping plugins");
        self.broadcast("on_stop", |plugin| async move { plugin.on_stop().await })
            .await;
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    /// Delivers a post to every plugin, then dispatches it as a command.
    pub async fn post(&self, post: Post) {
        self.broadcast("on_post", |plugin| {
            let post = post.clone();
            async move { plugin.on_post(post).await }
        })
        .await;

        match self.commands.dispatch(&post).await {
            Dispatch::NotACommand | Dispatch::Unknown(_) => {}
            Dispatch::Help(text) => {
                if let Err(e) = self.chat.create_post(post.reply(text)).await {
                    warn!(channel = %post.channel_id, error = %e, "Failed to send help reply");
                }
            }
            Dispatch::Handled {
                command,
                receiver,
                result: Err(e),
            } => {
                error!(plugin = %receiver, command = %command, error = %e, "Command handler failed");
            }
            Dispatch::Handled { .. } => {}
        }
    }

    /// Delivers an added reaction to every plugin.
    pub async fn reaction_added(&self, reaction: Reaction) {
        self.broadcast("on_reaction_added", |plugin| {
            let reaction = reaction.clone();
            async move { plugin.on_reaction_added(reaction).await }
        })
        .await;
    }

    /// Delivers a removed reaction to every plugin.
    pub async fn reaction_removed(&self, reaction: Reaction) {
        self.broadcast("on_reaction_removed", |plugin| {
            let reaction = reaction.clone();
            async move { plugin.on_reaction_removed(reaction).await }
        })
        .await;
    }
}

impl std::fmt::Debug for HookRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRouter")
            .field("plugins", &self.plugin_count())
            .field("commands", &self.commands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bronze_core::{
        ApiError, ApiResult, Channel, ChatApi, MessageIdentifier, PostResponse, User,
    };
    use parking_lot::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct RecordingChat {
        posts: Mutex<Vec<Post>>,
    }

    #[async_trait]
    impl ChatApi for RecordingChat {
        async fn create_post(&self, post: Post) -> ApiResult<PostResponse> {
            self.posts.lock().push(post);
            Ok(PostResponse::default())
        }

        async fn update_post(&self, _id: &MessageIdentifier, _post: Post) -> ApiResult<PostResponse> {
            Err(ApiError::NotConnected)
        }

        async fn delete_post(&self, _id: &MessageIdentifier) -> ApiResult<PostResponse> {
            Err(ApiError::NotConnected)
        }

        async fn get_user(&self, user_id: &str) -> ApiResult<User> {
            Err(ApiError::not_found("user", user_id))
        }

        async fn get_channel(&self, channel_id: &str) -> ApiResult<Channel> {
            Err(ApiError::not_found("channel", channel_id))
        }
    }

    struct Recorder {
        name: &'static str,
        journal: Journal,
        command: Option<&'static str>,
        fail_posts: bool,
        fail_commands: bool,
        api: Option<PluginApi>,
    }

    impl Recorder {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                command: None,
                fail_posts: false,
                fail_commands: false,
                api: None,
            }
        }

        fn record(&self, entry: String) {
            self.journal.lock().push(format!("{}:{}", self.name, entry));
        }
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn attach(&mut self, api: PluginApi) {
            if let Some(command) = self.command {
                api.register_command(command).unwrap();
            }
            self.api = Some(api);
        }

        async fn on_run(&self) -> HookResult {
            self.record("run".into());
            Ok(())
        }

        async fn on_stop(&self) -> HookResult {
            self.record("stop".into());
            Ok(())
        }

        async fn on_post(&self, post: Post) -> HookResult {
            self.record(format!("post {}", post.content));
            if self.fail_posts {
                return Err("boom".into());
            }
            Ok(())
        }

        async fn on_command(&self, command: &str, content: &str, _post: Post) -> HookResult {
            self.record(format!("command {command} [{content}]"));
            if self.fail_commands {
                return Err("bad dice".into());
            }
            Ok(())
        }

        async fn on_reaction_added(&self, reaction: Reaction) -> HookResult {
            self.record(format!("reaction+ {}", reaction.emoji));
            Ok(())
        }

        async fn on_reaction_removed(&self, reaction: Reaction) -> HookResult {
            self.record(format!("reaction- {}", reaction.emoji));
            Ok(())
        }
    }

    fn router() -> (HookRouter, Arc<RecordingChat>) {
        let chat = Arc::new(RecordingChat::default());
        (HookRouter::new(chat.clone(), "!"), chat)
    }

    fn post(content: &str) -> Post {
        Post {
            user_id: "7".into(),
            user: "bob".into(),
            channel_id: "general".into(),
            content: content.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let journal = Journal::default();
        let (router, _chat) = router();
        router.add_plugin(Recorder::new("a", &journal));
        router.add_plugin(Recorder::new("b", &journal));
        router.add_plugin(Recorder::new("c", &journal));

        router.run().await;
        router.post(post("hi")).await;
        router.stop().await;

        assert_eq!(
            *journal.lock(),
            vec![
                "a:run", "b:run", "c:run", "a:post hi", "b:post hi", "c:post hi", "a:stop",
                "b:stop", "c:stop",
            ]
        );
    }

    #[tokio::test]
    async fn failing_hook_does_not_stop_delivery() {
        let journal = Journal::default();
        let (router, _chat) = router();
        let mut failing = Recorder::new("a", &journal);
        failing.fail_posts = true;
        router.add_plugin(failing);
        router.add_plugin(Recorder::new("b", &journal));

        router.post(post("x")).await;
        router.post(post("y")).await;

        assert_eq!(
            *journal.lock(),
            vec!["a:post x", "b:post x", "a:post y", "b:post y"]
        );
    }

    #[tokio::test]
    async fn command_posts_reach_on_post_and_on_command() {
        let journal = Journal::default();
        let (router, _chat) = router();
        let mut roller = Recorder::new("roller", &journal);
        roller.command = Some("roll");
        router.add_plugin(roller);
        router.add_plugin(Recorder::new("logger", &journal));

        router.post(post("!roll  2d6 ")).await;

        assert_eq!(
            *journal.lock(),
            vec![
                "roller:post !roll  2d6 ",
                "logger:post !roll  2d6 ",
                "roller:command roll [2d6]",
            ]
        );
    }

    #[tokio::test]
    async fn help_is_answered_in_the_originating_channel() {
        let journal = Journal::default();
        let (router, chat) = router();
        let mut roller = Recorder::new("roller", &journal);
        roller.command = Some("roll");
        router.add_plugin(roller);

        router.post(post("!help")).await;

        let posts = chat.posts.lock();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel_id, "general");
        assert!(posts[0].content.contains("!roll"));
        assert!(posts[0].content.ends_with("only available for mods."));
    }

    #[tokio::test]
    async fn reactions_are_broadcast() {
        let journal = Journal::default();
        let (router, _chat) = router();
        router.add_plugin(Recorder::new("a", &journal));
        router.add_plugin(Recorder::new("b", &journal));

        let reaction = Reaction {
            emoji: "👍".into(),
            ..Default::default()
        };
        router.reaction_added(reaction.clone()).await;
        router.reaction_removed(reaction).await;

        assert_eq!(
            *journal.lock(),
            vec!["a:reaction+ 👍", "b:reaction+ 👍", "a:reaction- 👍", "b:reaction- 👍"]
        );
    }

    #[tokio::test]
    async fn plugin_api_exposes_prefix_and_unregister() {
        let journal = Journal::default();
        let (router, _chat) = router();
        let mut roller = Recorder::new("roller", &journal);
        roller.command = Some("roll");
        router.add_plugin(roller);

        assert_eq!(router.plugin_count(), 1);
        assert!(router.commands().is_registered("roll"));
        router.commands().unregister("roll");

        router.post(post("!roll")).await;
        assert_eq!(*journal.lock(), vec!["roller:post !roll"]);
    }

    #[tokio::test]
    async fn command_failures_name_the_plugin() {
        let journal = Journal::default();
        let (router, _chat) = router();
        let mut roller = Recorder::new("roller", &journal);
        roller.command = Some("roll");
        roller.fail_commands = true;
        router.add_plugin(roller);

        let outcome = router.commands().dispatch(&post("!roll 2d6")).await;
        assert!(matches!(
            outcome,
            Dispatch::Handled { ref command, ref receiver, result: Err(_) }
                if command == "roll" && receiver == "roller"
        ));

        router.post(post("!roll 1d4")).await;
        router.post(post("after")).await;
        assert_eq!(journal.lock().last().map(String::as_str), Some("roller:post after"));
    }
}

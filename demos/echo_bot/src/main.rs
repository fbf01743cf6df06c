//! Echo Bot
//!
//! Replies to `!echo <text>` with `<text>`. With `ECHO_ONLY_ON_WHISPER=1`
//! it only answers in private channels.
//!
//! # Configuration
//!
//! ```toml
//! # bronze.toml
//! [[bots]]
//! id = "echo"
//!
//! [bots.platform]
//! type = "discord"
//! token = "…"
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use anyhow::Result;
use tracing::{debug, info};

use bronze::prelude::*;

// ============================================================================
// Plugin
// ============================================================================

#[derive(Default)]
struct EchoPlugin {
    api: Option<PluginApi>,
    only_on_whisper: bool,
}

impl EchoPlugin {
    fn only_on_whisper(mut self, enabled: bool) -> Self {
        self.only_on_whisper = enabled;
        self
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    fn attach(&mut self, api: PluginApi) {
        if let Err(e) = api.register_command("echo") {
            api.log_error(&format!("cannot register echo: {e}"));
        }
        self.api = Some(api);
    }

    async fn on_run(&self) -> HookResult {
        info!(only_on_whisper = self.only_on_whisper, "Echo plugin ready");
        Ok(())
    }

    async fn on_command(&self, command: &str, content: &str, post: Post) -> HookResult {
        let Some(api) = &self.api else {
            return Ok(());
        };
        if command != "echo" || content.is_empty() {
            return Ok(());
        }
        if self.only_on_whisper && !post.is_private {
            debug!(channel = %post.channel_id, "Ignoring public echo");
            return Ok(());
        }

        api.create_post(post.reply(content)).await?;
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let only_on_whisper = std::env::var("ECHO_ONLY_ON_WHISPER")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut runtime = BronzeRuntime::builder().build()?;
    runtime
        .connect_bots(|_, bot| {
            bot.add_plugin(EchoPlugin::default().only_on_whisper(only_on_whisper));
        })
        .await?;

    runtime.run().await?;
    Ok(())
}

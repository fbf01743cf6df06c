//! Runtime orchestration.
//!
//! The runtime owns every configured bot, runs each one in its own task and
//! stops them all on Ctrl+C or SIGTERM.
//!
//! ```text
//!   BronzeRuntime::run
//!        │
//!        ├── spawn ──► supervise(bot "main")  ──► Bot::run ─┐ restart_on_failure
//!        ├── spawn ──► supervise(bot "alt")   ──► Bot::run  │◄┘ (after restart_delay)
//!        │
//!        └── wait_for_shutdown ──► cancel token ──► every Bot::run returns
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bronze_runtime::BronzeRuntime;
//!
//! let mut runtime = BronzeRuntime::builder().config_file("bronze.toml").build()?;
//! runtime
//!     .connect_bots(|_config, bot| bot.add_plugin(EchoPlugin::default()))
//!     .await?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bronze_adapter_discord::DiscordBot;
use bronze_core::{BotInfo, BoxedBot, GatewayError};

use crate::config::{BotConfig, BronzeConfig, ConfigLoader, PlatformConfig, RuntimeSettings};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Runs a set of bots until shutdown.
pub struct BronzeRuntime {
    config: BronzeConfig,
    bots: Vec<BoxedBot>,
    cancel: CancellationToken,
}

impl BronzeRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration and installs logging.
    ///
    /// An already installed subscriber is left in place.
    pub fn from_config(config: BronzeConfig) -> RuntimeResult<Self> {
        if !logging::init_from_config(&config.logging)? {
            debug!("Log subscriber already installed");
        }

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            bots = config.bots.len(),
            "Runtime initialised"
        );

        Ok(Self {
            config,
            bots: Vec::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &BronzeConfig {
        &self.config
    }

    /// Token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn bots(&self) -> &[BoxedBot] {
        &self.bots
    }

    /// Status of every bot, keyed by id.
    pub fn status(&self) -> Vec<(String, BotInfo)> {
        self.bots
            .iter()
            .map(|bot| (bot.id().to_string(), bot.info()))
            .collect()
    }

    /// Adds an already constructed bot.
    pub fn add_bot(&mut self, bot: BoxedBot) -> RuntimeResult<()> {
        if self.bots.iter().any(|existing| existing.id() == bot.id()) {
            return Err(RuntimeError::BotExists(bot.id().to_string()));
        }
        debug!(bot_id = bot.id(), "Bot added");
        self.bots.push(bot);
        Ok(())
    }

    /// Creates every enabled bot from the configuration.
    ///
    /// `setup` is called for each bot before it is added, which is where
    /// plugins get registered.
    pub async fn connect_bots<F>(&mut self, mut setup: F) -> RuntimeResult<()>
    where
        F: FnMut(&BotConfig, &DiscordBot),
    {
        let configs: Vec<BotConfig> = self.config.enabled_bots().cloned().collect();
        for config in configs {
            let bot = match &config.platform {
                PlatformConfig::Discord(discord) => {
                    DiscordBot::from_config(config.id.clone(), discord.clone())
                        .await
                        .map_err(|e| RuntimeError::bot(&config.id, e))?
                }
            };
            setup(&config, &bot);
            info!(
                bot_id = %config.id,
                platform = config.platform.name(),
                plugins = bot.router().plugin_count(),
                "Bot connected"
            );
            self.add_bot(Arc::new(bot))?;
        }
        Ok(())
    }

    /// Runs all bots until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs all bots until `shutdown` completes or every bot has stopped.
    ///
    /// Returns the first bot failure that happened before shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if self.bots.is_empty() {
            return Err(RuntimeError::NoBots);
        }

        let mut tasks = JoinSet::new();
        for bot in &self.bots {
            let bot = Arc::clone(bot);
            let cancel = self.cancel.clone();
            let settings = self.config.runtime.clone();
            tasks.spawn(async move {
                let result = supervise(&bot, cancel, settings).await;
                (bot.id().to_string(), result)
            });
        }
        info!(bots = self.bots.len(), "Runtime started");

        tokio::pin!(shutdown);
        let mut failure = None;
        loop {
            tokio::select! {
                _ = &mut shutdown, if !self.cancel.is_cancelled() => {
                    info!("Shutting down");
                    self.cancel.cancel();
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((id, Ok(())))) => info!(bot_id = %id, "Bot stopped"),
                    Some(Ok((id, Err(e)))) => {
                        error!(bot_id = %id, error = %e, "Bot failed");
                        if failure.is_none() {
                            failure = Some(RuntimeError::bot(id, e));
                        }
                    }
                    Some(Err(e)) => error!(error = %e, "Bot task aborted"),
                },
            }
        }

        self.cancel.cancel();
        info!("Runtime stopped");
        failure.map_or(Ok(()), Err)
    }
}

/// Runs one bot, restarting it after failures when configured.
async fn supervise(
    bot: &BoxedBot,
    cancel: CancellationToken,
    settings: RuntimeSettings,
) -> Result<(), GatewayError> {
    loop {
        let err = match bot.run(cancel.clone()).await {
            Ok(()) => return Ok(()),
            Err(_) if cancel.is_cancelled() => return Ok(()),
            Err(e) => e,
        };
        if !settings.restart_on_failure {
            return Err(err);
        }

        warn!(
            bot_id = bot.id(),
            error = %err,
            delay = ?settings.restart_delay,
            "Bot failed, restarting"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(settings.restart_delay) => {}
        }
    }
}

/// Completes on Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM"),
        }
    }

    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading configuration before creating a [`BronzeRuntime`].
///
/// ```rust,ignore
/// let runtime = BronzeRuntime::builder()
///     .config_file("deploy/bronze.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Layers `config` under files and environment.
    pub fn merge(mut self, config: BronzeConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<BronzeRuntime> {
        let config = self.loader.load()?;
        BronzeRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

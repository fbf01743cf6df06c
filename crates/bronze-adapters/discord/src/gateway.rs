//! Discord gateway connection lifecycle.
//!
//! A [`DiscordBot`] owns one gateway connection at a time and keeps it alive
//! for as long as `run` is driven:
//!
//! ```text
//!            ┌──────────────────────── supervisor (run) ───────────────────────┐
//!            │  select! { cancel, receive loop exit, watchdog failure signal } │
//!            └──────┬───────────────────────┬─────────────────────────┬───────┘
//!                   │ spawns                │ arms                    │ stops
//!            ┌──────▼───────┐        ┌──────▼─────┐           ┌──────▼──────┐
//!            │ receive loop │─ack──▶│  Watchdog  │           │  Heartbeat  │
//!            └──────┬───────┘        └────────────┘           └─────────────┘
//!                   │ decoded events
//!            ┌──────▼───────┐
//!            │  HookRouter  │──▶ plugins
//!            └──────────────┘
//! ```
//!
//! Recovery paths:
//!
//! - **going away** (close 1001): re-dial the same address with a fresh
//!   session; plugins are not restarted.
//! - **failure** (watchdog expiry or a transport error): tear the connection
//!   down, resolve the gateway again, dial it with backoff, fresh session.
//! - **invalid session**: fatal, `run` returns an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, trace, warn};

use bronze_core::{
    Bot, BotInfo, BoxedChatApi, BoxedResolver, BoxedTransport, ChatApi, CloseCode, GatewayError,
    GatewayResolver, GatewayResult, TransportError, Watchdog,
};
use bronze_framework::{HookRouter, Plugin};
use bronze_transport::WsTransport;

use crate::config::DiscordConfig;
use crate::event::{DomainEvent, decode_event};
use crate::heartbeat::Heartbeat;
use crate::protocol::{self, GatewayFrame, Hello, Opcode};
use crate::registry::Registry;
use crate::rest::DiscordRestClient;
use crate::session::{GatewayState, Session};

/// Platform name reported in [`BotInfo`].
pub const PLATFORM: &str = "discord";

/// Why a receive loop ended.
#[derive(Debug)]
enum LoopExit {
    /// The peer closed normally, or the connection was stopped locally.
    Closed,
    /// The peer is going away; the same address can be re-dialed.
    GoingAway,
    /// The gateway invalidated the session.
    InvalidSession,
    /// Any other read failure.
    Failed(TransportError),
}

/// Asynchronous failure reports from outside the receive loop.
#[derive(Debug, Clone, Copy)]
enum FailureSignal {
    /// No heartbeat acknowledgement arrived within two intervals.
    HeartbeatTimeout { epoch: u64 },
}

/// What woke the supervisor.
enum Wake {
    Cancelled,
    LoopExited(LoopExit),
    Failure(FailureSignal),
}

/// Outcome of a re-dial.
enum Redial {
    Connected(JoinHandle<LoopExit>),
    Cancelled,
}

// =============================================================================
// Shared state
// =============================================================================

/// State reachable from the supervisor, the receive loop and the watchdog.
struct Shared {
    config: DiscordConfig,
    transport: BoxedTransport,
    resolver: BoxedResolver,
    router: HookRouter,
    registry: RwLock<Registry>,
    watchdog: Watchdog,
    heartbeat: Mutex<Option<Heartbeat>>,
    session: Mutex<Session>,
    gateway_url: Mutex<String>,
    epoch: AtomicU64,
    state: watch::Sender<GatewayState>,
    plugins_running: AtomicBool,
    failures: mpsc::UnboundedSender<FailureSignal>,
}

impl Shared {
    fn set_state(&self, next: GatewayState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Gateway state changed");
        }
    }

    fn state(&self) -> GatewayState {
        *self.state.borrow()
    }

    fn gateway_url(&self) -> String {
        self.gateway_url.lock().clone()
    }

    async fn stop_heartbeat(&self) {
        let heartbeat = self.heartbeat.lock().take();
        if let Some(heartbeat) = heartbeat {
            heartbeat.stop().await;
        }
    }

    /// Starts a fresh session on the freshly dialed connection.
    fn spawn_session(self: &Arc<Self>, url: String) -> JoinHandle<LoopExit> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.session.lock() = Session::new(epoch, url.clone());
        *self.gateway_url.lock() = url;
        self.set_state(GatewayState::AwaitingHello);

        let shared = Arc::clone(self);
        tokio::spawn(receive_loop(shared, epoch).instrument(Span::current()))
    }

    // ─── Frame handling ─────────────────────────────────────────────────────

    async fn on_hello(&self, frame: &GatewayFrame, epoch: u64) {
        let hello = match Hello::deserialize(&frame.d) {
            Ok(hello) if hello.heartbeat_interval > 0 => hello,
            Ok(_) => {
                warn!("Hello carried a zero heartbeat interval");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Malformed hello payload");
                return;
            }
        };
        let interval = Duration::from_millis(hello.heartbeat_interval);

        // Identify once per session; a later hello only re-arms the timers.
        let identify = self.state() == GatewayState::AwaitingHello;
        if identify {
            debug!(interval = ?interval, "Received hello");
            self.set_state(GatewayState::Identifying);
            if let Err(e) = self
                .transport
                .send_json(&protocol::identify(&self.config.token))
                .await
            {
                warn!(error = %e, "Failed to send identify");
            }
        } else {
            debug!(interval = ?interval, state = %self.state(), "Repeated hello, re-arming heartbeat");
        }

        self.stop_heartbeat().await;
        let sequence = {
            let mut session = self.session.lock();
            session.heartbeat_interval = Some(interval);
            session.subscribe_sequence()
        };
        let heartbeat = Heartbeat::start(Arc::clone(&self.transport), interval, sequence);
        *self.heartbeat.lock() = Some(heartbeat);

        let failures = self.failures.clone();
        self.watchdog.arm(interval * 2, move || {
            let _ = failures.send(FailureSignal::HeartbeatTimeout { epoch });
        });

        if identify {
            self.set_state(GatewayState::AwaitingReady);
        }
    }

    async fn on_dispatch(&self, frame: GatewayFrame) {
        if let Some(sequence) = frame.s {
            self.session.lock().record_sequence(sequence);
        }
        let Some(event_type) = frame.t.as_deref() else {
            warn!(sequence = ?frame.s, "Dispatch frame without an event type");
            return;
        };
        let event = decode_event(event_type, &frame.d);
        trace!(event = %event.kind(), sequence = ?frame.s, "Dispatch");
        self.route(event).await;
    }

    async fn beat_now(&self) {
        let sequence = self.session.lock().sequence();
        debug!(sequence = ?sequence, "Gateway requested a heartbeat");
        if let Err(e) = self
            .transport
            .send_json(&protocol::heartbeat(sequence))
            .await
        {
            warn!(error = %e, "Failed to send requested heartbeat");
        }
    }

    // ─── Event routing ──────────────────────────────────────────────────────

    async fn route(&self, event: DomainEvent) {
        match event {
            DomainEvent::SessionReady(ready) => {
                self.session.lock().self_id = Some(ready.user.id.clone());
                info!(user = %ready.user.username, user_id = %ready.user.id, "Gateway session ready");
                self.set_state(GatewayState::SteadyState);
                if !self.plugins_running.swap(true, Ordering::SeqCst) {
                    self.router.run().await;
                }
            }
            DomainEvent::MessageCreated(message) => {
                let own = self.session.lock().is_self(&message.author.id);
                if own {
                    trace!(message_id = %message.id, "Ignoring own message");
                    return;
                }
                let is_private = self.registry.read().is_private(&message.channel_id);
                self.router.post(message.into_post(is_private)).await;
            }
            DomainEvent::ReactionAdded(reaction) => {
                self.router.reaction_added(reaction.into()).await;
            }
            DomainEvent::ReactionRemoved(reaction) => {
                self.router.reaction_removed(reaction.into()).await;
            }
            DomainEvent::ChannelCreated(channel) => {
                debug!(channel_id = %channel.id, recipients = channel.recipients.len(), "Channel created");
                self.registry.write().add_channel(&channel);
            }
            DomainEvent::GuildCreated(guild) => {
                debug!(guild_id = %guild.id, guild = %guild.name, "Guild available");
                self.registry.write().add_guild(&guild);
            }
            DomainEvent::MessageUpdated(message) => {
                debug!(message_id = %message.id, channel_id = %message.channel_id, "Message updated");
            }
            DomainEvent::MessageDeleted(message) => {
                debug!(message_id = %message.id, channel_id = %message.channel_id, "Message deleted");
            }
            DomainEvent::PresenceChanged(presence) => {
                trace!(user_id = %presence.user.id, status = ?presence.status, "Presence changed");
            }
            DomainEvent::TypingStarted(typing) => {
                trace!(user_id = %typing.user_id, channel_id = %typing.channel_id, "Typing started");
            }
            DomainEvent::Unknown { event_type } => {
                debug!(event = %event_type, "Unhandled dispatch event");
            }
        }
    }
}

/// Reads frames until the connection ends, handling each one in order.
async fn receive_loop(shared: Arc<Shared>, epoch: u64) -> LoopExit {
    let exit = loop {
        let frame = match shared.transport.read_message().await {
            Ok(frame) => frame,
            Err(e) => break classify(e),
        };

        let frame = match GatewayFrame::parse(&frame.data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed gateway frame");
                continue;
            }
        };

        match frame.opcode() {
            Opcode::Hello => shared.on_hello(&frame, epoch).await,
            Opcode::Dispatch => shared.on_dispatch(frame).await,
            Opcode::HeartbeatAck => {
                trace!("Heartbeat acknowledged");
                shared.watchdog.feed();
            }
            Opcode::Heartbeat => shared.beat_now().await,
            Opcode::InvalidSession => {
                error!("Gateway invalidated the session");
                break LoopExit::InvalidSession;
            }
            other => debug!(op = other.as_u64(), "Unhandled gateway opcode"),
        }
    };

    shared.stop_heartbeat().await;
    debug!(exit = ?exit, "Receive loop ended");
    exit
}

fn classify(error: TransportError) -> LoopExit {
    match error.close_code() {
        Some(CloseCode::Normal) => LoopExit::Closed,
        Some(CloseCode::GoingAway) => LoopExit::GoingAway,
        _ if matches!(error, TransportError::NotConnected) => LoopExit::Closed,
        _ => LoopExit::Failed(error),
    }
}

// =============================================================================
// DiscordBot
// =============================================================================

/// A bot connected to the Discord gateway.
///
/// # Example
///
/// ```rust,ignore
/// let bot = DiscordBot::from_config("main", config).await?;
/// bot.add_plugin(EchoPlugin::default());
/// bot.run(cancel).await?;
/// ```
pub struct DiscordBot {
    id: String,
    shared: Arc<Shared>,
    failures: tokio::sync::Mutex<mpsc::UnboundedReceiver<FailureSignal>>,
}

impl DiscordBot {
    /// Creates a bot and resolves its gateway address.
    ///
    /// The connection is not opened until [`run`](Bot::run).
    pub async fn new(
        id: impl Into<String>,
        config: DiscordConfig,
        transport: BoxedTransport,
        resolver: BoxedResolver,
        chat: BoxedChatApi,
    ) -> GatewayResult<Self> {
        let id = id.into();
        let url = resolver
            .resolve_gateway()
            .await
            .map_err(GatewayError::Resolve)?;
        info!(bot_id = %id, gateway = %url, "Resolved gateway");

        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        let router = HookRouter::new(chat, config.call_prefix.clone());
        let shared = Arc::new(Shared {
            config,
            transport,
            resolver,
            router,
            registry: RwLock::new(Registry::new()),
            watchdog: Watchdog::new(),
            heartbeat: Mutex::new(None),
            session: Mutex::new(Session::new(0, url.clone())),
            gateway_url: Mutex::new(url),
            epoch: AtomicU64::new(0),
            state: watch::Sender::new(GatewayState::Disconnected),
            plugins_running: AtomicBool::new(false),
            failures: failures_tx,
        });

        Ok(Self {
            id,
            shared,
            failures: tokio::sync::Mutex::new(failures_rx),
        })
    }

    /// Creates a bot talking to Discord over WebSocket and REST.
    pub async fn from_config(id: impl Into<String>, config: DiscordConfig) -> GatewayResult<Self> {
        let rest = Arc::new(DiscordRestClient::new(&config)?);
        let transport: BoxedTransport = Arc::new(WsTransport::new());
        let resolver: BoxedResolver = Arc::clone(&rest) as Arc<dyn GatewayResolver>;
        let chat: BoxedChatApi = rest as Arc<dyn ChatApi>;
        Self::new(id, config, transport, resolver, chat).await
    }

    /// Registers a plugin. Plugins added after the session is ready do not
    /// receive `on_run`.
    pub fn add_plugin<P: Plugin>(&self, plugin: P) {
        self.shared.router.add_plugin(plugin);
    }

    /// Current connection state.
    pub fn state(&self) -> GatewayState {
        self.shared.state()
    }

    /// Watches state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<GatewayState> {
        self.shared.state.subscribe()
    }

    /// Gateway address of the current (or next) connection.
    pub fn gateway_url(&self) -> String {
        self.shared.gateway_url()
    }

    /// The bot's own user id, once READY has been seen.
    pub fn self_id(&self) -> Option<String> {
        self.shared.session.lock().self_id.clone()
    }

    /// Looks up a guild id by name.
    pub fn guild_id(&self, name: &str) -> Option<String> {
        self.shared.registry.read().guild_id(name).map(str::to_string)
    }

    /// The plugin router of this bot.
    pub fn router(&self) -> &HookRouter {
        &self.shared.router
    }

    // ─── Supervisor ─────────────────────────────────────────────────────────

    async fn supervise(&self, cancel: CancellationToken) -> GatewayResult<()> {
        let shared = &self.shared;
        let mut failures = self.failures.lock().await;

        let url = shared.gateway_url();
        shared.set_state(GatewayState::Dialing);
        info!(gateway = %url, "Connecting to gateway");
        if let Err(e) = shared.transport.dial(&url).await {
            let err = GatewayError::dial(url, e);
            self.fail(&err).await;
            return Err(err);
        }
        let mut receiver = shared.spawn_session(url);

        loop {
            let wake = tokio::select! {
                biased;
                _ = cancel.cancelled() => Wake::Cancelled,
                exit = &mut receiver => Wake::LoopExited(exit.unwrap_or_else(|e| {
                    LoopExit::Failed(TransportError::Io(format!("receive loop panicked: {e}")))
                })),
                Some(signal) = failures.recv() => Wake::Failure(signal),
            };

            let next = match wake {
                Wake::Cancelled => {
                    self.shutdown(Some(receiver)).await;
                    return Ok(());
                }
                Wake::LoopExited(LoopExit::Closed) => {
                    info!("Gateway closed the connection");
                    self.shutdown(None).await;
                    return Ok(());
                }
                Wake::LoopExited(LoopExit::InvalidSession) => {
                    let err = GatewayError::InvalidSession;
                    self.fail(&err).await;
                    return Err(err);
                }
                Wake::LoopExited(LoopExit::GoingAway) => self.redial_same(&cancel).await,
                Wake::LoopExited(LoopExit::Failed(e)) => {
                    warn!(error = %e, "Gateway connection failed");
                    self.recover(None, &cancel).await
                }
                Wake::Failure(FailureSignal::HeartbeatTimeout { epoch }) => {
                    if epoch != shared.epoch.load(Ordering::SeqCst) {
                        trace!(epoch, "Ignoring stale failure signal");
                        continue;
                    }
                    warn!("No heartbeat acknowledgement, connection presumed dead");
                    self.recover(Some(receiver), &cancel).await
                }
            };

            receiver = match next {
                Ok(Redial::Connected(receiver)) => receiver,
                Ok(Redial::Cancelled) => {
                    self.shutdown(None).await;
                    return Ok(());
                }
                Err(err) => {
                    self.fail(&err).await;
                    return Err(err);
                }
            };
        }
    }

    /// Going away: same address, fresh session, plugins untouched.
    async fn redial_same(&self, cancel: &CancellationToken) -> GatewayResult<Redial> {
        let shared = &self.shared;
        info!("Gateway is going away, reconnecting");
        shared.set_state(GatewayState::Reconnecting);
        shared.watchdog.disarm();
        shared.stop_heartbeat().await;
        shared.transport.stop().await;

        let url = shared.gateway_url();
        self.dial_with_retry(url, cancel).await
    }

    /// Full recovery: tear down, resolve again, dial, fresh session.
    async fn recover(
        &self,
        receiver: Option<JoinHandle<LoopExit>>,
        cancel: &CancellationToken,
    ) -> GatewayResult<Redial> {
        let shared = &self.shared;
        shared.set_state(GatewayState::Reconnecting);
        shared.stop_heartbeat().await;
        shared.watchdog.disarm();
        if let Some(receiver) = receiver {
            if let Err(e) = shared.transport.close().await {
                debug!(error = %e, "Failed to send close frame");
            }
            self.join_receiver(receiver).await;
        }
        shared.transport.stop().await;

        let url = shared
            .resolver
            .resolve_gateway()
            .await
            .map_err(GatewayError::Resolve)?;
        info!(gateway = %url, "Re-resolved gateway");
        self.dial_with_retry(url, cancel).await
    }

    async fn dial_with_retry(
        &self,
        url: String,
        cancel: &CancellationToken,
    ) -> GatewayResult<Redial> {
        let shared = &self.shared;
        let retry = &shared.config.retry;
        let mut attempt = 0;

        loop {
            match shared.transport.dial(&url).await {
                Ok(()) => {
                    info!(gateway = %url, "Reconnected to gateway");
                    return Ok(Redial::Connected(shared.spawn_session(url)));
                }
                Err(e) if attempt < retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    attempt += 1;
                    warn!(attempt, delay = ?delay, error = %e, "Dial failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(Redial::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(GatewayError::dial(url, e)),
            }
        }
    }

    /// Waits for the receive loop, aborting it after the close timeout.
    async fn join_receiver(&self, mut receiver: JoinHandle<LoopExit>) {
        let timeout = self.shared.config.close_timeout;
        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(exit) => trace!(exit = ?exit.ok(), "Receive loop joined"),
            Err(_) => {
                warn!(timeout = ?timeout, "Receive loop did not exit in time, aborting");
                receiver.abort();
                let _ = receiver.await;
            }
        }
    }

    /// Orderly shutdown: plugins first, then timers, then the connection.
    async fn shutdown(&self, receiver: Option<JoinHandle<LoopExit>>) {
        let shared = &self.shared;
        shared.set_state(GatewayState::ShuttingDown);
        info!("Shutting down");

        if shared.plugins_running.swap(false, Ordering::SeqCst) {
            shared.router.stop().await;
        }
        shared.stop_heartbeat().await;
        shared.watchdog.disarm();

        if let Some(receiver) = receiver {
            if let Err(e) = shared.transport.close().await {
                debug!(error = %e, "Failed to send close frame");
            }
            self.join_receiver(receiver).await;
        }
        shared.transport.stop().await;

        shared.set_state(GatewayState::Closed);
        info!("Shut down");
    }

    /// Unrecoverable error: release everything and mark the bot failed.
    async fn fail(&self, err: &GatewayError) {
        let shared = &self.shared;
        error!(error = %err, "Gateway session failed");

        if shared.plugins_running.swap(false, Ordering::SeqCst) {
            shared.router.stop().await;
        }
        shared.stop_heartbeat().await;
        shared.watchdog.disarm();
        shared.transport.stop().await;
        shared.set_state(GatewayState::Failed);
    }
}

#[async_trait]
impl Bot for DiscordBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> BotInfo {
        let state = self.shared.state();
        BotInfo {
            platform: PLATFORM,
            state: state.to_string(),
            healthy: state == GatewayState::SteadyState,
            plugin_count: self.shared.router.plugin_count(),
        }
    }

    async fn run(&self, cancel: CancellationToken) -> GatewayResult<()> {
        let span = info_span!("bot", bot_id = %self.id, platform = PLATFORM);
        self.supervise(cancel).instrument(span).await
    }
}

impl std::fmt::Debug for DiscordBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordBot")
            .field("id", &self.id)
            .field("state", &self.shared.state())
            .field("gateway_url", &self.shared.gateway_url())
            .finish()
    }
}

//! Per-connection session data and the gateway state machine.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

/// Lifecycle state of a gateway connection.
///
/// ```text
/// Disconnected ──▶ Dialing ──▶ AwaitingHello ──hello──▶ Identifying
///                                                          │
///        SteadyState ◀──ready── AwaitingReady ◀────────────┘
///            │
///            ├── going away / failure ──▶ Reconnecting ──▶ AwaitingHello
///            ├── cancel ──▶ ShuttingDown ──▶ Closed
///            └── invalid session / unrecoverable ──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayState {
    Disconnected,
    Dialing,
    AwaitingHello,
    Identifying,
    AwaitingReady,
    SteadyState,
    Reconnecting,
    ShuttingDown,
    Closed,
    Failed,
}

impl GatewayState {
    /// Whether no further transitions will happen without a new `run`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Dialing => "dialing",
            Self::AwaitingHello => "awaiting hello",
            Self::Identifying => "identifying",
            Self::AwaitingReady => "awaiting ready",
            Self::SteadyState => "steady",
            Self::Reconnecting => "reconnecting",
            Self::ShuttingDown => "shutting down",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of one gateway connection.
///
/// A fresh session is created for every successful dial, so the sequence
/// number and heartbeat interval never leak across reconnects.
pub struct Session {
    /// Connection counter this session belongs to.
    pub epoch: u64,
    /// Address the session was dialed on.
    pub gateway_url: String,
    /// Bot identity reported by READY.
    pub self_id: Option<String>,
    /// Interval announced by hello.
    pub heartbeat_interval: Option<Duration>,
    sequence: watch::Sender<Option<u64>>,
}

impl Session {
    pub fn new(epoch: u64, gateway_url: impl Into<String>) -> Self {
        Self {
            epoch,
            gateway_url: gateway_url.into(),
            self_id: None,
            heartbeat_interval: None,
            sequence: watch::Sender::new(None),
        }
    }

    /// Last sequence number seen on a dispatch frame.
    pub fn sequence(&self) -> Option<u64> {
        *self.sequence.borrow()
    }

    /// Records the sequence number of a dispatch frame.
    pub fn record_sequence(&self, sequence: u64) {
        self.sequence.send_replace(Some(sequence));
    }

    /// A receiver the heartbeat task reads the sequence from.
    pub fn subscribe_sequence(&self) -> watch::Receiver<Option<u64>> {
        self.sequence.subscribe()
    }

    /// Whether `user_id` is the bot itself.
    pub fn is_self(&self, user_id: &str) -> bool {
        self.self_id.as_deref() == Some(user_id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("epoch", &self.epoch)
            .field("gateway_url", &self.gateway_url)
            .field("self_id", &self.self_id)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_empty() {
        let session = Session::new(1, "wss://gw");
        assert_eq!(session.sequence(), None);
        assert!(session.self_id.is_none());
        assert!(!session.is_self("anyone"));
    }

    #[test]
    fn recorded_sequence_reaches_subscribers() {
        let session = Session::new(1, "wss://gw");
        let rx = session.subscribe_sequence();
        session.record_sequence(7);
        assert_eq!(session.sequence(), Some(7));
        assert_eq!(*rx.borrow(), Some(7));
    }

    #[test]
    fn states_render_for_humans() {
        assert_eq!(GatewayState::SteadyState.to_string(), "steady");
        assert_eq!(GatewayState::AwaitingHello.to_string(), "awaiting hello");
        assert!(GatewayState::Failed.is_terminal());
        assert!(!GatewayState::Reconnecting.is_terminal());
    }
}

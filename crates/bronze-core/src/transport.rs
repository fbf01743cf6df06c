//! The transport capability and its frame types.
//!
//! A [`Transport`] owns at most one live connection. The gateway session
//! drives it: dial, send frames, read frames, close, and finally stop to
//! release the socket. Concrete implementations live in `bronze-transport`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TransportError, TransportResult};

// =============================================================================
// Frames
// =============================================================================

/// Kind of a transport frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Text,
    Binary,
    /// A close frame; `data` holds the close code (big endian) and reason.
    Close,
}

/// A single message on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameType,
    pub data: Vec<u8>,
}

impl Frame {
    /// Creates a text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: FrameType::Text,
            data: text.into().into_bytes(),
        }
    }

    /// Creates a binary frame.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: FrameType::Binary,
            data: data.into(),
        }
    }

    /// Creates a close frame carrying `code` and `reason`.
    pub fn close(code: CloseCode, reason: &str) -> Self {
        let mut data = code.as_u16().to_be_bytes().to_vec();
        data.extend_from_slice(reason.as_bytes());
        Self {
            kind: FrameType::Close,
            data,
        }
    }

    /// Returns the payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Decodes the close code of a close frame.
    ///
    /// A close frame without a payload counts as a normal closure.
    pub fn close_code(&self) -> Option<CloseCode> {
        if self.kind != FrameType::Close {
            return None;
        }
        match self.data.as_slice() {
            [hi, lo, ..] => Some(CloseCode::from(u16::from_be_bytes([*hi, *lo]))),
            _ => Some(CloseCode::Normal),
        }
    }
}

/// WebSocket close codes the gateway lifecycle distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000: orderly shutdown.
    Normal,
    /// 1001: the server is going away; the same address can be re-dialed.
    GoingAway,
    /// Anything else.
    Other(u16),
}

impl CloseCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::GoingAway => 1001,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "1000 normal"),
            Self::GoingAway => write!(f, "1001 going away"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// A connection capability driven by a gateway session.
///
/// All methods take `&self`: the receive loop reads while the heartbeat task
/// and the supervisor write, so implementations must allow one reader and
/// concurrent writers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection to `url`, replacing any previous one.
    async fn dial(&self, url: &str) -> TransportResult<()>;

    /// Sends a frame.
    async fn send_message(&self, frame: Frame) -> TransportResult<()>;

    /// Serializes `value` and sends it as a text frame.
    async fn send_json(&self, value: &Value) -> TransportResult<()> {
        let text =
            serde_json::to_string(value).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.send_message(Frame::text(text)).await
    }

    /// Waits for the next data frame.
    ///
    /// A close frame from the peer is reported as
    /// [`TransportError::Closed`] with the peer's code.
    async fn read_message(&self) -> TransportResult<Frame>;

    /// Sends a normal close frame. The connection stays readable so the
    /// peer's close reply can be observed.
    async fn close(&self) -> TransportResult<()>;

    /// Releases the connection. Pending and future reads fail with
    /// [`TransportError::NotConnected`].
    async fn stop(&self);
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

// =============================================================================
// Retry
// =============================================================================

/// Retry configuration for (re-)dialing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial delay between retries.
    #[serde(with = "humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Serde module for human-readable `Duration` values (`"500ms"`, `"5s"`, `"2m"`).
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(mins) = s.strip_suffix('m') {
            let mins = mins.trim().parse::<u64>().map_err(|e| e.to_string())?;
            mins.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration out of range: {s}"))
        } else {
            // Default to seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_frame_round_trips_code() {
        let frame = Frame::close(CloseCode::GoingAway, "restart");
        assert_eq!(frame.close_code(), Some(CloseCode::GoingAway));
        assert_eq!(&frame.data[2..], b"restart");

        let bare = Frame {
            kind: FrameType::Close,
            data: Vec::new(),
        };
        assert_eq!(bare.close_code(), Some(CloseCode::Normal));
        assert_eq!(Frame::text("x").close_code(), None);
    }

    #[test]
    fn close_code_from_u16() {
        assert_eq!(CloseCode::from(1000), CloseCode::Normal);
        assert_eq!(CloseCode::from(1001), CloseCode::GoingAway);
        assert_eq!(CloseCode::from(4004), CloseCode::Other(4004));
        assert_eq!(CloseCode::Other(4004).as_u16(), 4004);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(350));
        assert_eq!(retry.delay_for(30), Duration::from_millis(350));
    }

    #[test]
    fn parses_human_durations() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration(" 7 "), Ok(Duration::from_secs(7)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn oversized_minutes_are_rejected() {
        use humantime_serde::parse_duration;
        let max = format!("{}m", u64::MAX / 60);
        assert_eq!(parse_duration(&max), Ok(Duration::from_secs(u64::MAX / 60 * 60)));
        assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
    }
}

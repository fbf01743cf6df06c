//! Gateway wire format.
//!
//! Every gateway message is a JSON envelope:
//!
//! ```json
//! { "op": 0, "d": { … }, "s": 42, "t": "MESSAGE_CREATE" }
//! ```
//!
//! `s` and `t` are only present on dispatch (`op` 0) frames.

use serde::Deserialize;
use serde_json::{Value, json};

/// `large_threshold` sent with identify.
pub const LARGE_THRESHOLD: u64 = 250;

/// Gateway opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// 0: an event was dispatched.
    Dispatch,
    /// 1: heartbeat (sent by us, or requested by the server).
    Heartbeat,
    /// 2: identify.
    Identify,
    /// 9: the session has been invalidated.
    InvalidSession,
    /// 10: sent right after connecting, carries the heartbeat interval.
    Hello,
    /// 11: heartbeat acknowledged.
    HeartbeatAck,
    /// Any opcode not handled by this client.
    Other(u64),
}

impl From<u64> for Opcode {
    fn from(op: u64) -> Self {
        match op {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            other => Self::Other(other),
        }
    }
}

impl Opcode {
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
            Self::Other(op) => op,
        }
    }
}

/// A decoded gateway envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayFrame {
    pub op: u64,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayFrame {
    /// Parses an envelope from raw frame bytes.
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::from(self.op)
    }
}

/// Payload of the hello frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// Builds the identify frame.
pub fn identify(token: &str) -> Value {
    json!({
        "op": Opcode::Identify.as_u64(),
        "d": {
            "token": token,
            "properties": {},
            "compress": false,
            "large_threshold": LARGE_THRESHOLD,
        }
    })
}

/// Builds a heartbeat frame carrying the last seen sequence number.
pub fn heartbeat(sequence: Option<u64>) -> Value {
    json!({
        "op": Opcode::Heartbeat.as_u64(),
        "d": sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_matches_wire_format() {
        let expected: Value = serde_json::from_str(
            r#"{"op":2,"d":{"token":"T","properties":{},"compress":false,"large_threshold":250}}"#,
        )
        .unwrap();
        assert_eq!(identify("T"), expected);
    }

    #[test]
    fn heartbeat_carries_sequence_or_null() {
        assert_eq!(heartbeat(None), json!({"op": 1, "d": null}));
        assert_eq!(heartbeat(Some(42)), json!({"op": 1, "d": 42}));
    }

    #[test]
    fn parses_dispatch_envelope() {
        let frame =
            GatewayFrame::parse(br#"{"op":0,"s":3,"t":"READY","d":{"user":{"id":"1"}}}"#).unwrap();
        assert_eq!(frame.opcode(), Opcode::Dispatch);
        assert_eq!(frame.s, Some(3));
        assert_eq!(frame.t.as_deref(), Some("READY"));
    }

    #[test]
    fn parses_control_frames_without_sequence() {
        let frame = GatewayFrame::parse(br#"{"op":11}"#).unwrap();
        assert_eq!(frame.opcode(), Opcode::HeartbeatAck);
        assert_eq!(frame.s, None);
        assert!(frame.d.is_null());

        let frame = GatewayFrame::parse(br#"{"op":7,"d":null}"#).unwrap();
        assert_eq!(frame.opcode(), Opcode::Other(7));
    }

    #[test]
    fn rejects_non_json() {
        assert!(GatewayFrame::parse(b"not json").is_err());
        assert!(GatewayFrame::parse(br#"{"d":{}}"#).is_err());
    }
}

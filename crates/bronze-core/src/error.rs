//! Unified error types for the Bronze core.
//!
//! Each layer gets its own enum. Framework-level errors (command and plugin
//! registration) live in `bronze-framework`; configuration errors live in
//! `bronze-runtime`.

use thiserror::Error;

use crate::transport::CloseCode;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The peer (or we) closed the connection.
    #[error("connection closed ({code}): {reason}")]
    Closed {
        /// Close code carried by the close frame.
        code: CloseCode,
        /// Reason text carried by the close frame.
        reason: String,
    },

    /// No connection has been dialed, or it was already stopped.
    #[error("transport is not connected")]
    NotConnected,

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Reading from the connection failed.
    #[error("failed to read message: {0}")]
    ReadFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a close error.
    pub fn closed(code: CloseCode, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
        }
    }

    /// Returns the close code if this error is a close.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Closed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by outbound chat API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API client has no usable connection.
    #[error("not connected")]
    NotConnected,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request could not be sent.
    #[error("request failed: {0}")]
    Request(String),

    /// Encoding the request or decoding the response failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Entity kind, e.g. `"user"`.
        kind: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// The plugin that issued the call has been dropped.
    #[error("command receiver is gone")]
    ReceiverGone,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates an HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Gateway Errors
// =============================================================================

/// Fatal errors that end a gateway session supervisor.
///
/// Transient failures (missed heartbeats, going-away closes, read errors) are
/// recovered internally and never surface as a `GatewayError`.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway address could not be obtained from the API.
    #[error("failed to resolve gateway: {0}")]
    Resolve(#[source] ApiError),

    /// Dialing the gateway failed (after retries, when retrying applies).
    #[error("failed to dial gateway {url}: {source}")]
    Dial {
        /// The gateway URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The gateway rejected the session (opcode 9).
    #[error("session invalidated by the gateway")]
    InvalidSession,

    /// Unrecoverable transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl GatewayError {
    /// Creates a dial error.
    pub fn dial(url: impl Into<String>, source: TransportError) -> Self {
        Self::Dial {
            url: url.into(),
            source,
        }
    }
}

// =============================================================================
// Hook Errors
// =============================================================================

/// Error type returned by plugin hooks.
///
/// Hook failures are logged by the router and never stop delivery, so any
/// error type is accepted.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for gateway supervisors.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type for plugin hooks.
pub type HookResult = Result<(), HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_is_exposed_only_for_closes() {
        let closed = TransportError::closed(CloseCode::GoingAway, "bye");
        assert_eq!(closed.close_code(), Some(CloseCode::GoingAway));
        assert_eq!(TransportError::NotConnected.close_code(), None);
    }

    #[test]
    fn gateway_error_messages() {
        let err = GatewayError::dial("wss://gw", TransportError::NotConnected);
        assert_eq!(
            err.to_string(),
            "failed to dial gateway wss://gw: transport is not connected"
        );
        assert_eq!(
            GatewayError::InvalidSession.to_string(),
            "session invalidated by the gateway"
        );
    }
}

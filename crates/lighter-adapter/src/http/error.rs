/*
[INPUT]:  Error sources (HTTP, API payloads, serialization, WebSocket transport, local misuse)
[OUTPUT]: Structured error type with taxonomy and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Lighter adapter
#[derive(Error, Debug)]
pub enum LighterError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status or embedded code
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket handshake, read or write failed
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    /// A bounded operation did not finish in time
    #[error("{operation} timed out after {}ms", duration.as_millis())]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// Inbound frame could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Channel key already has an active subscription
    #[error("Already subscribed to {channel}")]
    AlreadySubscribed { channel: String },

    /// Operation requires a live connection
    #[error("WebSocket not connected")]
    NotConnected,

    /// Connection dropped underneath a running service
    #[error("WebSocket connection lost")]
    ConnectionLost,

    /// Capability not offered by this service
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// Subscription callback reported a failure
    #[error("Handler error: {0}")]
    Handler(String),

    /// Credential could not be produced
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used to decide how an error propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Handshake/read/write failures; surfaced and followed by the disconnect path
    Transport,
    /// Malformed frames or bodies; logged and dropped on the stream
    Protocol,
    /// Non-success code embedded in a decoded payload
    Application,
    /// Local misuse, returned synchronously with no side effect
    State,
}

impl LighterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LighterError::Http(_)
            | LighterError::Transport(_)
            | LighterError::Timeout { .. }
            | LighterError::ConnectionLost => ErrorKind::Transport,
            LighterError::Serialization(_) | LighterError::Protocol(_) => ErrorKind::Protocol,
            LighterError::Api { .. } | LighterError::Handler(_) | LighterError::Auth(_) => {
                ErrorKind::Application
            }
            LighterError::UrlParse(_)
            | LighterError::AlreadySubscribed { .. }
            | LighterError::NotConnected
            | LighterError::UnsupportedOperation { .. }
            | LighterError::Config(_) => ErrorKind::State,
        }
    }

    /// Check if the error is worth retrying by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport)
    }

    /// Check if the error is local misuse rather than a remote failure
    pub fn is_state_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::State)
    }

    /// Create an API error from an HTTP status and the response body
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        LighterError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        LighterError::Transport(err.to_string())
    }
}

/// Result type alias for Lighter operations
pub type Result<T> = std::result::Result<T, LighterError>;

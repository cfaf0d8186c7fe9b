//! Client error types.

use gremlin_protocol::{ProtocolError, StatusCode};
use thiserror::Error;
use uuid::Uuid;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("transport error: {0}")]
    Transport(String),

    /// Outbound encoding failure. Decode failures become `MalformedResponse`.
    #[error("protocol error: {0}")]
    Protocol(#[source] ProtocolError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("no server available: all {attempted} endpoint(s) failed")]
    NoServerAvailable { attempted: usize },

    #[error("server error: {code} - {message}")]
    ServerError {
        code: StatusCode,
        message: &'static str,
        /// Message the server put in `status.message`.
        detail: String,
    },

    #[error("unexpected status {code}: {reason}")]
    UnexpectedStatus {
        code: StatusCode,
        reason: &'static str,
    },

    #[error("request {0} is already in flight")]
    DuplicateRequestId(Uuid),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl ClientError {
    /// Returns whether a calling layer could reasonably retry.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::NoServerAvailable { .. } => true,
            ClientError::ServerError { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// Returns the status code for server-reported failures.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ClientError::ServerError { code, .. } | ClientError::UnexpectedStatus { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::Protocol(err)
        }
    }
}

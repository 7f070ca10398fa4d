//! Error taxonomy for connection-level failures.
//!
//! Every variant here is contained at the connection boundary: it closes or
//! degrades one client and never touches another client's session.

use std::time::Duration;
use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// Failure on the underlying transport of a single connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("close failed: {0}")]
    Close(String),

    #[error("write deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("connection already closed")]
    Closed,
}

/// Why a connection never reached the ready phase.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("no init payload within {0:?}")]
    Timeout(Duration),

    #[error("malformed init payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] ValidationError),

    #[error("transport error during handshake: {0}")]
    Transport(#[from] TransportError),

    #[error("connection closed before init payload")]
    ConnectionClosed,
}

impl HandshakeError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HandshakeError::Timeout(_) => "timeout",
            HandshakeError::MalformedPayload(_) => "malformed_payload",
            HandshakeError::InvalidIdentity(_) => "invalid_identity",
            HandshakeError::Transport(_) => "transport",
            HandshakeError::ConnectionClosed => "closed",
        }
    }
}

//! socket.io error types

use crate::types::SessionState;
use std::time::Duration;
use thiserror::Error;

/// Error type for socket.io client operations
#[derive(Debug, Error)]
pub enum SocketIoError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(#[from] PacketError),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Connection not established within {0:?}")]
    ConnectTimeout(Duration),

    #[error("Server refused namespace connection: {0}")]
    ConnectRefused(String),

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Client is not connected (state: {0})")]
    NotConnected(SessionState),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("No event received within {0:?}")]
    ReceiveTimeout(Duration),
}

impl SocketIoError {
    /// Whether the error is one of the two timeout variants
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SocketIoError::ConnectTimeout(_) | SocketIoError::ReceiveTimeout(_)
        )
    }
}

/// Error type for Engine.IO / socket.io packet decoding
#[derive(Debug, Error, PartialEq)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    #[error("binary packets are not supported")]
    BinaryUnsupported,

    #[error("invalid ack id")]
    InvalidAckId,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_timeout() {
        assert!(SocketIoError::ConnectTimeout(Duration::from_secs(5)).is_timeout());
        assert!(SocketIoError::ReceiveTimeout(Duration::from_secs(5)).is_timeout());
        assert!(!SocketIoError::ConnectionClosed.is_timeout());
        assert!(!SocketIoError::ConnectRefused("nope".to_string()).is_timeout());
    }
}

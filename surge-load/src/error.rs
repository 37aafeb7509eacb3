//! Load generation error types

use std::time::Duration;
use surge_socketio::{SessionState, SocketIoError};
use thiserror::Error;

/// Runner configuration errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Abstract user classes only provide shared behavior
    #[error("User class '{0}' is abstract and cannot be spawned")]
    AbstractUser(String),

    /// Nothing to run
    #[error("No user classes registered")]
    NoUserClasses,

    /// Invalid run parameters
    #[error("Invalid run parameters: {0}")]
    InvalidParameters(String),
}

/// Failure of one health-check round trip
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The session never connected or has been closed
    #[error("Client is not connected (state: {0})")]
    NotConnected(SessionState),

    /// Emitting or receiving failed at the transport level
    #[error("Transport error: {0}")]
    Transport(#[source] SocketIoError),

    /// No reply arrived in time
    #[error("No reply received within {0:?}")]
    Timeout(Duration),

    /// The connection went away before a reply arrived
    #[error("No response received from server!")]
    NoResponse,

    /// Reply body is not valid JSON
    #[error("Failed to parse JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// Reply does not match the request contract
    #[error("{0}")]
    Assertion(&'static str),
}

impl HealthCheckError {
    pub const EVENT_NAME_MISMATCH: &'static str = "Event name mismatch!";
    pub const PAYLOAD_MISMATCH: &'static str = "Response payload mismatch!";

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, HealthCheckError::Timeout(_))
    }

    /// Check if the reply arrived but violated the contract
    pub fn is_assertion(&self) -> bool {
        matches!(self, HealthCheckError::Assertion(_))
    }
}

impl From<SocketIoError> for HealthCheckError {
    fn from(error: SocketIoError) -> Self {
        match error {
            SocketIoError::NotConnected(state) => HealthCheckError::NotConnected(state),
            SocketIoError::ReceiveTimeout(timeout) => HealthCheckError::Timeout(timeout),
            SocketIoError::ConnectionClosed => HealthCheckError::NoResponse,
            other => HealthCheckError::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socketio_error_mapping() {
        let error: HealthCheckError = SocketIoError::ReceiveTimeout(Duration::from_secs(5)).into();
        assert!(error.is_timeout());

        let error: HealthCheckError = SocketIoError::NotConnected(SessionState::Closed).into();
        assert!(matches!(error, HealthCheckError::NotConnected(SessionState::Closed)));

        let error: HealthCheckError = SocketIoError::ConnectionClosed.into();
        assert_eq!(error.to_string(), "No response received from server!");

        let error: HealthCheckError = SocketIoError::AlreadyConnected.into();
        assert!(matches!(error, HealthCheckError::Transport(_)));
    }

    #[test]
    fn test_assertion_messages() {
        let error = HealthCheckError::Assertion(HealthCheckError::EVENT_NAME_MISMATCH);
        assert!(error.is_assertion());
        assert_eq!(error.to_string(), "Event name mismatch!");
    }
}

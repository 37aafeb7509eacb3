//! socket.io client types

use serde_json::Value as JsonValue;
use std::fmt;

/// Lifecycle of one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Closed,
}

impl SessionState {
    /// Get the string representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Closed => "closed",
        }
    }

    /// Whether events can be emitted and received
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event delivered by the server
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    /// Event name (first element of the event array)
    pub name: String,
    /// Remaining elements of the event array
    pub args: Vec<JsonValue>,
    /// The event array as it appeared on the wire
    pub raw: String,
}

impl ReceivedEvent {
    /// Build an event from a decoded socket.io event array
    pub fn from_array(items: Vec<JsonValue>) -> Option<Self> {
        let raw = JsonValue::Array(items.clone()).to_string();
        let mut items = items.into_iter();
        let name = match items.next() {
            Some(JsonValue::String(name)) => name,
            _ => return None,
        };
        Some(Self {
            name,
            args: items.collect(),
            raw,
        })
    }

    /// First argument after the event name
    pub fn first_arg(&self) -> Option<&JsonValue> {
        self.args.first()
    }

    /// Length of the event in characters
    pub fn char_len(&self) -> usize {
        self.raw.chars().count()
    }
}

//! socket.io client functionality for surge
//!
//! This crate speaks Engine.IO v4 / socket.io v5 over a WebSocket transport and
//! exposes a small blocking-style client: connect, emit an event, receive the
//! next event with a timeout, disconnect.

pub mod client;
pub mod config;
pub mod errors;
pub mod packet;
pub mod types;

// Re-export main types for convenience
pub use client::{SimpleClient, SocketIoClient};
pub use config::ClientConfig;
pub use errors::{PacketError, SocketIoError};
pub use packet::{EnginePacket, OpenHandshake, PacketKind, SocketPacket};
pub use types::{ReceivedEvent, SessionState};

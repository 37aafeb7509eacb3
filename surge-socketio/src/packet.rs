//! Engine.IO v4 and socket.io v5 text packet codec
//!
//! An Engine.IO packet is a single type digit followed by an optional payload.
//! socket.io packets travel inside Engine.IO `message` packets and have the
//! shape `<type>[/<namespace>,][<ack id>][<json data>]`.

use crate::errors::PacketError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Handshake data carried by the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode an Engine.IO packet from a WebSocket text frame
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let payload = chars.as_str();

        match kind {
            '0' => serde_json::from_str(payload)
                .map(EnginePacket::Open)
                .map_err(|e| PacketError::InvalidPayload(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(payload.to_string())),
            '3' => Ok(EnginePacket::Pong(payload.to_string())),
            '4' => Ok(EnginePacket::Message(payload.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    /// Encode the packet as WebSocket frame text
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// socket.io packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl PacketKind {
    fn from_digit(c: char) -> Result<Self, PacketError> {
        match c {
            '0' => Ok(PacketKind::Connect),
            '1' => Ok(PacketKind::Disconnect),
            '2' => Ok(PacketKind::Event),
            '3' => Ok(PacketKind::Ack),
            '4' => Ok(PacketKind::ConnectError),
            '5' => Ok(PacketKind::BinaryEvent),
            '6' => Ok(PacketKind::BinaryAck),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    fn digit(&self) -> char {
        match self {
            PacketKind::Connect => '0',
            PacketKind::Disconnect => '1',
            PacketKind::Event => '2',
            PacketKind::Ack => '3',
            PacketKind::ConnectError => '4',
            PacketKind::BinaryEvent => '5',
            PacketKind::BinaryAck => '6',
        }
    }
}

/// socket.io packet
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: PacketKind,
    pub namespace: String,
    pub id: Option<u64>,
    pub data: Option<JsonValue>,
}

impl SocketPacket {
    /// Namespace connect request
    pub fn connect(namespace: &str, auth: Option<JsonValue>) -> Self {
        Self {
            kind: PacketKind::Connect,
            namespace: namespace.to_string(),
            id: None,
            data: auth,
        }
    }

    /// Namespace disconnect notice
    pub fn disconnect(namespace: &str) -> Self {
        Self {
            kind: PacketKind::Disconnect,
            namespace: namespace.to_string(),
            id: None,
            data: None,
        }
    }

    /// Event with a name and positional arguments
    pub fn event(namespace: &str, name: &str, args: Vec<JsonValue>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(JsonValue::String(name.to_string()));
        items.extend(args);
        Self {
            kind: PacketKind::Event,
            namespace: namespace.to_string(),
            id: None,
            data: Some(JsonValue::Array(items)),
        }
    }

    /// Event array of an `Event` packet
    pub fn event_items(&self) -> Option<&Vec<JsonValue>> {
        match (&self.kind, &self.data) {
            (PacketKind::Event, Some(JsonValue::Array(items))) => Some(items),
            _ => None,
        }
    }

    /// Decode a socket.io packet from the payload of an Engine.IO message
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = PacketKind::from_digit(chars.next().ok_or(PacketError::Empty)?)?;
        if matches!(kind, PacketKind::BinaryEvent | PacketKind::BinaryAck) {
            return Err(PacketError::BinaryUnsupported);
        }
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(end) => {
                    let namespace = &rest[..end];
                    rest = &rest[end + 1..];
                    namespace.to_string()
                }
                None => {
                    let namespace = rest.to_string();
                    rest = "";
                    namespace
                }
            }
        } else {
            "/".to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|_| PacketError::InvalidAckId)?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| PacketError::InvalidPayload(e.to_string()))?,
            )
        };

        Ok(Self {
            kind,
            namespace,
            id,
            data,
        })
    }

    /// Encode the packet as the payload of an Engine.IO message
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.digit());

        if self.namespace != "/" && !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            if self.id.is_some() || self.data.is_some() {
                out.push(',');
            }
        }

        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }

        if let Some(ref data) = self.data {
            out.push_str(&data.to_string());
        }

        out
    }

    /// Wrap the packet into an Engine.IO message
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

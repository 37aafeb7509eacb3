//! Mock socket.io server for integration tests
//!
//! Speaks just enough Engine.IO v4 / socket.io v5 to accept a namespace
//! connection and answer `health-check` events in a configurable way.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value as JsonValue};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_socketio::{EnginePacket, PacketKind, SocketPacket};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How the server answers a `health-check` event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyMode {
    /// `re-health-check` with `{"userBody": <request>}`
    Echo,
    /// Correct body under the event name `wrong-event`
    WrongEvent,
    /// `re-health-check` with a different body
    MismatchedBody,
    /// `re-health-check` with a payload that is not JSON
    InvalidJson,
    /// Never answer
    Silent,
}

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub mode: ReplyMode,
    /// Send an Engine.IO ping right after the namespace connect
    pub ping_after_connect: bool,
    /// Accept the WebSocket but never send the Engine.IO open packet
    pub stall_handshake: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            mode: ReplyMode::Echo,
            ping_after_connect: false,
            stall_handshake: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub connections: AtomicUsize,
    pub events: AtomicUsize,
    pub pongs: AtomicUsize,
    pub disconnects: AtomicUsize,
}

pub struct MockServer {
    addr: SocketAddr,
    counters: Arc<Counters>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(mode: ReplyMode) -> Self {
        Self::start_with(MockOptions {
            mode,
            ..Default::default()
        })
        .await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let counters = Arc::new(Counters::default());

        let server_counters = counters.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(
                    stream,
                    options.clone(),
                    server_counters.clone(),
                ));
            }
        });

        Self {
            addr,
            counters,
            handle,
        }
    }

    /// Origin URL to point a client at
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Poll `counter` until it reaches `expected` or two seconds pass
    pub async fn wait_for(&self, counter: impl Fn(&Counters) -> usize, expected: usize) -> bool {
        for _ in 0..200 {
            if counter(&self.counters) >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(stream: TcpStream, options: MockOptions, counters: Arc<Counters>) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    counters.connections.fetch_add(1, Ordering::SeqCst);
    let (mut sink, mut source) = ws.split();

    if options.stall_handshake {
        while let Some(Ok(_)) = source.next().await {}
        return;
    }

    let sid = uuid::Uuid::new_v4().simple().to_string();
    let open = json!({
        "sid": sid,
        "upgrades": [],
        "pingInterval": 25000,
        "pingTimeout": 20000,
        "maxPayload": 1000000
    });
    if sink.send(Message::text(format!("0{}", open))).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = source.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        let payload = match EnginePacket::decode(text.as_str()) {
            Ok(EnginePacket::Pong(_)) => {
                counters.pongs.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            Ok(EnginePacket::Message(payload)) => payload,
            _ => continue,
        };

        let Ok(packet) = SocketPacket::decode(&payload) else {
            continue;
        };

        let mut outgoing = Vec::new();
        match packet.kind {
            PacketKind::Connect => {
                let ack = SocketPacket {
                    kind: PacketKind::Connect,
                    namespace: packet.namespace.clone(),
                    id: None,
                    data: Some(json!({ "sid": format!("ns-{}", sid) })),
                };
                outgoing.push(ack.into_engine().encode());
                if options.ping_after_connect {
                    outgoing.push(EnginePacket::Ping(String::new()).encode());
                }
            }
            PacketKind::Event => {
                counters.events.fetch_add(1, Ordering::SeqCst);
                if let Some(reply) = build_reply(options.mode, &packet) {
                    outgoing.push(reply.into_engine().encode());
                }
            }
            PacketKind::Disconnect => {
                counters.disconnects.fetch_add(1, Ordering::SeqCst);
                break;
            }
            _ => {}
        }

        for frame in outgoing {
            if sink.send(Message::text(frame)).await.is_err() {
                return;
            }
        }
    }
}

fn build_reply(mode: ReplyMode, packet: &SocketPacket) -> Option<SocketPacket> {
    let request: JsonValue = packet
        .event_items()
        .and_then(|items| items.get(1))
        .and_then(JsonValue::as_str)
        .and_then(|text| serde_json::from_str(text).ok())
        .unwrap_or(JsonValue::Null);

    let (event, payload) = match mode {
        ReplyMode::Echo => ("re-health-check", json!({ "userBody": request }).to_string()),
        ReplyMode::WrongEvent => ("wrong-event", json!({ "userBody": request }).to_string()),
        ReplyMode::MismatchedBody => (
            "re-health-check",
            json!({ "userBody": { "userId": "99999", "action": "other", "log": "" } }).to_string(),
        ),
        ReplyMode::InvalidJson => ("re-health-check", "<html>502 Bad Gateway</html>".to_string()),
        ReplyMode::Silent => return None,
    };

    Some(SocketPacket::event(
        &packet.namespace,
        event,
        vec![JsonValue::String(payload)],
    ))
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("surge_socketio=debug,surge_load=debug")
        .with_test_writer()
        .try_init();
}

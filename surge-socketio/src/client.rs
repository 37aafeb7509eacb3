//! socket.io client implementation

use crate::config::ClientConfig;
use crate::errors::SocketIoError;
use crate::packet::{EnginePacket, PacketKind, SocketPacket};
use crate::types::{ReceivedEvent, SessionState};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long `disconnect` waits for queued frames to be flushed
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// socket.io client trait for one logical connection
#[async_trait::async_trait]
pub trait SocketIoClient: Send {
    /// Open the transport and join the configured namespace
    async fn connect(&mut self) -> Result<(), SocketIoError>;

    /// Emit `event` with positional arguments
    async fn emit(&mut self, event: &str, args: Vec<JsonValue>) -> Result<(), SocketIoError>;

    /// Wait up to `timeout` for the next event sent by the server
    async fn receive(&mut self, timeout: Duration) -> Result<ReceivedEvent, SocketIoError>;

    /// Leave the namespace and close the transport
    async fn disconnect(&mut self) -> Result<(), SocketIoError>;

    /// Current lifecycle state
    fn state(&self) -> SessionState;

    /// Session id assigned by the server while connected
    fn sid(&self) -> Option<&str>;
}

/// Live transport of a connected client
struct Connection {
    sid: String,
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedReceiver<ReceivedEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Sequential socket.io client
///
/// A background reader answers Engine.IO heartbeats and queues incoming
/// events; `receive` pops them in arrival order.
pub struct SimpleClient {
    config: ClientConfig,
    state: SessionState,
    connection: Option<Connection>,
}

impl SimpleClient {
    /// Create a new client; no I/O happens until `connect`
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            connection: None,
        }
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, SocketIoError> {
        let state = self.state;
        match self.connection.as_mut() {
            Some(connection) if state.is_connected() => Ok(connection),
            _ => Err(SocketIoError::NotConnected(state)),
        }
    }

    /// WebSocket upgrade, Engine.IO open and namespace connect
    async fn open(&self) -> Result<Connection, SocketIoError> {
        let url = self.config.endpoint_url()?;

        let mut request = url.as_str().into_client_request()?;
        for (name, value) in &self.config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SocketIoError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| SocketIoError::InvalidHeader(format!("{}: {}", name, value)))?;
            request.headers_mut().insert(header_name, header_value);
        }

        debug!(%url, "Opening WebSocket transport");
        let (ws, _response) = connect_async(request).await?;
        let (mut sink, mut source) = ws.split();

        let handshake = loop {
            match read_engine_packet(&mut source).await? {
                EnginePacket::Open(handshake) => break handshake,
                other => debug!(?other, "Ignoring packet before Engine.IO open"),
            }
        };
        debug!(
            sid = %handshake.sid,
            ping_interval = handshake.ping_interval,
            ping_timeout = handshake.ping_timeout,
            "Engine.IO session opened"
        );

        let namespace = self.config.namespace.clone();
        send_engine(&mut sink, SocketPacket::connect(&namespace, None).into_engine()).await?;

        let sid = loop {
            match read_engine_packet(&mut source).await? {
                EnginePacket::Ping(data) => send_engine(&mut sink, EnginePacket::Pong(data)).await?,
                EnginePacket::Message(payload) => {
                    let packet = SocketPacket::decode(&payload)?;
                    if packet.namespace != namespace {
                        continue;
                    }
                    match packet.kind {
                        PacketKind::Connect => {
                            break packet
                                .data
                                .as_ref()
                                .and_then(|data| data.get("sid"))
                                .and_then(JsonValue::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(|| handshake.sid.clone());
                        }
                        PacketKind::ConnectError => {
                            let reason = packet.data.map(|d| d.to_string()).unwrap_or_default();
                            return Err(SocketIoError::ConnectRefused(reason));
                        }
                        other => debug!(?other, "Ignoring packet before namespace connect"),
                    }
                }
                EnginePacket::Close => return Err(SocketIoError::ConnectionClosed),
                other => debug!(?other, "Ignoring packet during namespace connect"),
            }
        };

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, outbound_rx));
        let reader = tokio::spawn(read_loop(source, outbound.clone(), events_tx, namespace));

        Ok(Connection {
            sid,
            outbound,
            events,
            reader,
            writer,
        })
    }
}

#[async_trait::async_trait]
impl SocketIoClient for SimpleClient {
    async fn connect(&mut self) -> Result<(), SocketIoError> {
        if self.state.is_connected() {
            return Err(SocketIoError::AlreadyConnected);
        }

        self.state = SessionState::Connecting;
        let timeout = self.config.connect_timeout;

        match tokio::time::timeout(timeout, self.open()).await {
            Ok(Ok(connection)) => {
                debug!(sid = %connection.sid, "socket.io namespace joined");
                self.connection = Some(connection);
                self.state = SessionState::Connected;
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = SessionState::Closed;
                Err(e)
            }
            Err(_) => {
                self.state = SessionState::Closed;
                Err(SocketIoError::ConnectTimeout(timeout))
            }
        }
    }

    async fn emit(&mut self, event: &str, args: Vec<JsonValue>) -> Result<(), SocketIoError> {
        let frame = SocketPacket::event(&self.config.namespace, event, args)
            .into_engine()
            .encode();
        let connection = self.connection_mut()?;

        trace!(%frame, "Emitting event");
        connection
            .outbound
            .send(Message::text(frame))
            .map_err(|_| SocketIoError::ConnectionClosed)
    }

    async fn receive(&mut self, timeout: Duration) -> Result<ReceivedEvent, SocketIoError> {
        let connection = self.connection_mut()?;
        let result = tokio::time::timeout(timeout, connection.events.recv()).await;

        match result {
            Ok(Some(event)) => Ok(event),
            Ok(None) => {
                self.state = SessionState::Closed;
                Err(SocketIoError::ConnectionClosed)
            }
            Err(_) => Err(SocketIoError::ReceiveTimeout(timeout)),
        }
    }

    async fn disconnect(&mut self) -> Result<(), SocketIoError> {
        let Some(connection) = self.connection.take() else {
            self.state = SessionState::Closed;
            return Ok(());
        };
        self.state = SessionState::Disconnecting;

        let Connection {
            sid,
            outbound,
            reader,
            mut writer,
            ..
        } = connection;

        let frame = SocketPacket::disconnect(&self.config.namespace)
            .into_engine()
            .encode();
        let sent = outbound.send(Message::text(frame));

        // The reader holds a sender clone; it must be gone before the writer can drain
        reader.abort();
        let _ = reader.await;
        drop(outbound);

        if tokio::time::timeout(DISCONNECT_GRACE, &mut writer).await.is_err() {
            warn!(%sid, "Timed out flushing WebSocket close, dropping transport");
            writer.abort();
        }

        self.state = SessionState::Closed;
        debug!(%sid, "socket.io client disconnected");

        sent.map_err(|_| SocketIoError::ConnectionClosed)
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn sid(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.sid.as_str())
    }
}

impl Drop for SimpleClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.reader.abort();
            connection.writer.abort();
        }
    }
}

/// Read the next text frame and decode it as an Engine.IO packet
async fn read_engine_packet(source: &mut WsSource) -> Result<EnginePacket, SocketIoError> {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::decode(text.as_str())?),
            Some(Ok(Message::Close(_))) | None => return Err(SocketIoError::ConnectionClosed),
            Some(Ok(Message::Binary(_))) => warn!("Ignoring binary frame"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn send_engine(sink: &mut WsSink, packet: EnginePacket) -> Result<(), SocketIoError> {
    sink.send(Message::text(packet.encode())).await?;
    Ok(())
}

async fn write_loop(mut sink: WsSink, mut outbound: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = sink.send(message).await {
            debug!("WebSocket write failed: {}", e);
            return;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut source: WsSource,
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedSender<ReceivedEvent>,
    namespace: String,
) {
    loop {
        let packet = match read_engine_packet(&mut source).await {
            Ok(packet) => packet,
            Err(SocketIoError::ConnectionClosed) => {
                debug!("WebSocket transport closed");
                break;
            }
            Err(SocketIoError::InvalidPacket(e)) => {
                warn!("Dropping malformed Engine.IO packet: {}", e);
                continue;
            }
            Err(e) => {
                warn!("WebSocket read failed: {}", e);
                break;
            }
        };

        match packet {
            EnginePacket::Ping(data) => {
                let pong = Message::text(EnginePacket::Pong(data).encode());
                if outbound.send(pong).is_err() {
                    break;
                }
            }
            EnginePacket::Message(payload) => match SocketPacket::decode(&payload) {
                Ok(packet) if packet.namespace != namespace => {
                    debug!(namespace = %packet.namespace, "Ignoring packet for another namespace");
                }
                Ok(packet) => match packet.kind {
                    PacketKind::Event => {
                        let event = match packet.data {
                            Some(JsonValue::Array(items)) => ReceivedEvent::from_array(items),
                            _ => None,
                        };
                        match event {
                            Some(event) => {
                                trace!(event = %event.name, "Event received");
                                if events.send(event).is_err() {
                                    break;
                                }
                            }
                            None => warn!("Dropping event without a name"),
                        }
                    }
                    PacketKind::Disconnect => {
                        debug!("Server closed the namespace");
                        break;
                    }
                    other => debug!(?other, "Ignoring socket.io packet"),
                },
                Err(e) => warn!("Dropping malformed socket.io packet: {}", e),
            },
            EnginePacket::Close => {
                debug!("Server closed the Engine.IO session");
                break;
            }
            _ => {}
        }
    }
}

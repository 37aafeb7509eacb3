//! socket.io client against a local mock server

mod common;

use common::{init_tracing, MockOptions, MockServer, ReplyMode};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::Ordering;
use std::time::Duration;
use surge_socketio::{ClientConfig, SessionState, SimpleClient, SocketIoClient, SocketIoError};

fn client_for(server: &MockServer) -> SimpleClient {
    let mut config = ClientConfig::for_url(server.url());
    config.connect_timeout = Duration::from_secs(2);
    SimpleClient::new(config)
}

#[tokio::test]
async fn test_connect_and_disconnect() {
    init_tracing();
    let server = MockServer::start(ReplyMode::Echo).await;
    let mut client = client_for(&server);

    assert_eq!(client.state(), SessionState::Idle);
    client.connect().await.unwrap();
    assert_eq!(client.state(), SessionState::Connected);
    assert!(client.sid().unwrap().starts_with("ns-"));

    assert!(matches!(
        client.connect().await,
        Err(SocketIoError::AlreadyConnected)
    ));

    client.disconnect().await.unwrap();
    assert_eq!(client.state(), SessionState::Closed);
    assert!(client.sid().is_none());
    assert!(server.wait_for(|c| c.disconnects.load(Ordering::SeqCst), 1).await);

    // A second disconnect is a no-op
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_server_ping_is_answered() {
    init_tracing();
    let server = MockServer::start_with(MockOptions {
        ping_after_connect: true,
        ..Default::default()
    })
    .await;
    let mut client = client_for(&server);

    client.connect().await.unwrap();
    assert!(server.wait_for(|c| c.pongs.load(Ordering::SeqCst), 1).await);

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_emit_and_receive_echo() {
    init_tracing();
    let server = MockServer::start(ReplyMode::Echo).await;
    let mut client = client_for(&server);
    client.connect().await.unwrap();

    let body = json!({"userId": "00001", "action": "test", "log": "中文測試"}).to_string();
    client
        .emit("health-check", vec![JsonValue::String(body.clone())])
        .await
        .unwrap();

    let reply = client.receive(Duration::from_secs(2)).await.unwrap();
    assert_eq!(reply.name, "re-health-check");

    let payload: JsonValue = serde_json::from_str(reply.first_arg().unwrap().as_str().unwrap()).unwrap();
    assert_eq!(payload["userBody"], serde_json::from_str::<JsonValue>(&body).unwrap());
    assert!(reply.char_len() > 0);

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_receive_times_out() {
    init_tracing();
    let server = MockServer::start(ReplyMode::Silent).await;
    let mut client = client_for(&server);
    client.connect().await.unwrap();

    client.emit("health-check", vec![json!("{}")]).await.unwrap();
    let result = client.receive(Duration::from_millis(200)).await;
    assert!(matches!(result, Err(SocketIoError::ReceiveTimeout(_))));

    // Still usable after a timeout
    assert_eq!(client.state(), SessionState::Connected);
    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_connect_timeout_when_handshake_stalls() {
    init_tracing();
    let server = MockServer::start_with(MockOptions {
        stall_handshake: true,
        ..Default::default()
    })
    .await;

    let mut config = ClientConfig::for_url(server.url());
    config.connect_timeout = Duration::from_millis(300);
    let mut client = SimpleClient::new(config);

    let result = client.connect().await;
    assert!(matches!(result, Err(SocketIoError::ConnectTimeout(_))));
    assert_eq!(client.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ClientConfig::for_url(format!("http://{}/", addr));
    config.connect_timeout = Duration::from_secs(2);
    let mut client = SimpleClient::new(config);

    let result = client.connect().await;
    assert!(matches!(result, Err(SocketIoError::WebSocket(_))));
    assert_eq!(client.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_emit_requires_connection() {
    let mut client = SimpleClient::new(ClientConfig::for_url("http://127.0.0.1:1/"));
    let result = client.emit("health-check", vec![json!("{}")]).await;
    assert!(matches!(
        result,
        Err(SocketIoError::NotConnected(SessionState::Idle))
    ));
}

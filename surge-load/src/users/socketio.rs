//! socket.io session shared by socket.io users

use crate::user::UserBlueprint;
use surge_config::TargetConfig;
use surge_socketio::{ClientConfig, SessionState, SimpleClient, SocketIoClient};
use tracing::{error, info};

/// One logical socket.io identity with a single transport connection
///
/// Connection and disconnection failures are logged and swallowed; a task
/// running on a session that never connected fails with a not-connected
/// error instead.
pub struct SocketIoSession {
    client: Box<dyn SocketIoClient>,
    url: String,
}

impl SocketIoSession {
    /// Session backed by a real WebSocket client for `target`
    pub fn new(target: &TargetConfig) -> Self {
        let config = ClientConfig::from(target.clone());
        Self {
            url: config.url.clone(),
            client: Box::new(SimpleClient::new(config)),
        }
    }

    /// Session backed by an arbitrary client
    pub fn with_client(client: Box<dyn SocketIoClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// User class name for sessions; abstract, only concrete users run
    pub fn blueprint() -> UserBlueprint {
        UserBlueprint::abstract_class("SocketIoSession")
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SessionState {
        self.client.state()
    }

    pub fn client_mut(&mut self) -> &mut dyn SocketIoClient {
        self.client.as_mut()
    }

    /// Open the connection
    pub async fn start(&mut self) {
        match self.client.connect().await {
            Ok(()) => info!(
                url = %self.url,
                sid = self.client.sid().unwrap_or_default(),
                "socket.io client connected"
            ),
            Err(e) => error!(url = %self.url, "Failed to connect: {}", e),
        }
    }

    /// Close the connection
    pub async fn stop(&mut self) {
        match self.client.disconnect().await {
            Ok(()) => info!(url = %self.url, "socket.io client disconnected"),
            Err(e) => error!(url = %self.url, "Failed to disconnect: {}", e),
        }
    }
}

//! socket.io client configuration

use crate::errors::SocketIoError;
use std::collections::BTreeMap;
use std::time::Duration;
use surge_config::TargetConfig;
use url::Url;

/// Engine.IO protocol revision spoken by the client
pub const ENGINE_IO_VERSION: &str = "4";

/// socket.io client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin of the server, `http(s)://` or `ws(s)://`
    pub url: String,

    /// Path of the socket.io endpoint
    pub socketio_path: String,

    /// Namespace to join
    pub namespace: String,

    /// Extra handshake headers
    pub headers: BTreeMap<String, String>,

    /// Deadline for the whole connect handshake
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        TargetConfig::default().into()
    }
}

impl From<TargetConfig> for ClientConfig {
    fn from(config: TargetConfig) -> Self {
        Self {
            url: config.url,
            socketio_path: config.socketio_path,
            namespace: config.namespace,
            headers: config.headers,
            connect_timeout: config.connect_timeout,
        }
    }
}

impl ClientConfig {
    /// Build a configuration for `url` with default path, headers and timeout
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// WebSocket URL of the Engine.IO endpoint
    ///
    /// The path of `url` is replaced by `socketio_path`; any query string is
    /// kept and the Engine.IO parameters are appended.
    pub fn endpoint_url(&self) -> Result<Url, SocketIoError> {
        let mut url =
            Url::parse(&self.url).map_err(|e| SocketIoError::InvalidUrl(format!("{}: {}", self.url, e)))?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(SocketIoError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| SocketIoError::InvalidUrl(format!("cannot use scheme '{}'", scheme)))?;

        let path = self.socketio_path.trim_matches('/');
        if path.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&format!("/{}/", path));
        }

        url.query_pairs_mut()
            .append_pair("EIO", ENGINE_IO_VERSION)
            .append_pair("transport", "websocket");

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "wss://inquiry.lazyinwork.com/s/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_plain_http_maps_to_ws() {
        let mut config = ClientConfig::for_url("http://127.0.0.1:4000/ignored/path?token=abc");
        config.socketio_path = "/socket.io".to_string();
        assert_eq!(
            config.endpoint_url().unwrap().as_str(),
            "ws://127.0.0.1:4000/socket.io/?token=abc&EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(
            ClientConfig::for_url("ftp://example.com").endpoint_url(),
            Err(SocketIoError::InvalidUrl(_))
        ));
        assert!(matches!(
            ClientConfig::for_url("not a url").endpoint_url(),
            Err(SocketIoError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_target_config() {
        let target = TargetConfig {
            namespace: "/health".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let config = ClientConfig::from(target);
        assert_eq!(config.namespace, "/health");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(
            config.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }
}

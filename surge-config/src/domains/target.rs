//! Target endpoint configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// URL schemes accepted for the target origin
pub const TARGET_SCHEMES: &[&str] = &["http", "https", "ws", "wss"];

/// socket.io endpoint the simulated users connect to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Origin of the socket.io server
    #[serde(default = "default_url")]
    pub url: String,

    /// Path of the socket.io endpoint, relative to the origin
    #[serde(default = "default_socketio_path")]
    pub socketio_path: String,

    /// socket.io namespace joined after the Engine.IO handshake
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Extra headers sent with the WebSocket handshake
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Time allowed for the full connect handshake
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_connect_timeout"
    )]
    pub connect_timeout: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            socketio_path: default_socketio_path(),
            namespace: default_namespace(),
            headers: default_headers(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.url, TARGET_SCHEMES, "url", self.domain_name())?;
        validate_required_string(&self.socketio_path, "socketio_path", self.domain_name())?;

        if !self.namespace.starts_with('/') {
            return Err(self.validation_error(format!(
                "namespace must start with '/', got '{}'",
                self.namespace
            )));
        }

        for name in self.headers.keys() {
            validate_required_string(name, "header name", self.domain_name())?;
        }

        validate_positive(
            self.connect_timeout.as_secs_f64(),
            "connect_timeout",
            self.domain_name(),
        )?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

// Default value functions
fn default_url() -> String {
    "https://inquiry.lazyinwork.com/".to_string()
}

fn default_socketio_path() -> String {
    "s/socket.io/".to_string()
}

fn default_namespace() -> String {
    "/".to_string()
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_config_defaults() {
        let config = TargetConfig::default();
        assert_eq!(config.url, "https://inquiry.lazyinwork.com/");
        assert_eq!(config.socketio_path, "s/socket.io/");
        assert_eq!(config.namespace, "/");
        assert_eq!(
            config.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_config_validation() {
        let mut config = TargetConfig::default();
        config.url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config = TargetConfig::default();
        config.namespace = "chat".to_string();
        assert!(config.validate().is_err());

        config = TargetConfig::default();
        config.connect_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}

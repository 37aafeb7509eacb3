//! Health-check payload and reply configuration

use crate::error::ConfigResult;
use crate::validation::{validate_event_name, validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the health-check user sends and what it expects back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// `userId` field of the request body
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// `action` field of the request body
    #[serde(default = "default_action")]
    pub action: String,

    /// `log` field of the request body
    #[serde(default = "default_log")]
    pub log: String,

    /// Event emitted for each round trip
    #[serde(default = "default_event")]
    pub event: String,

    /// Event the server is expected to reply with
    #[serde(default = "default_reply_event")]
    pub reply_event: String,

    /// How long to wait for the reply
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_reply_timeout"
    )]
    pub reply_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            action: default_action(),
            log: default_log(),
            event: default_event(),
            reply_event: default_reply_event(),
            reply_timeout: default_reply_timeout(),
        }
    }
}

impl Validatable for HealthCheckConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_event_name(&self.event, "event", self.domain_name())?;
        validate_event_name(&self.reply_event, "reply_event", self.domain_name())?;
        validate_positive(
            self.reply_timeout.as_secs_f64(),
            "reply_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "health_check"
    }
}

// Default value functions
fn default_user_id() -> String {
    "00001".to_string()
}

fn default_action() -> String {
    "test".to_string()
}

fn default_log() -> String {
    "200 GET \"something text\" 中文測試".to_string()
}

fn default_event() -> String {
    "health-check".to_string()
}

fn default_reply_event() -> String {
    "re-health-check".to_string()
}

fn default_reply_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_defaults() {
        let config = HealthCheckConfig::default();
        assert_eq!(config.user_id, "00001");
        assert_eq!(config.action, "test");
        assert_eq!(config.log, "200 GET \"something text\" 中文測試");
        assert_eq!(config.event, "health-check");
        assert_eq!(config.reply_event, "re-health-check");
        assert_eq!(config.reply_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reserved_event_rejected() {
        let config = HealthCheckConfig {
            reply_event: "disconnect".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Configuration loading and environment variable handling

use crate::domains::utils::parse_seconds;
use crate::domains::SurgeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SURGE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SurgeConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml_str(&content)
    }

    /// Load configuration from YAML text with environment overrides
    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<SurgeConfig> {
        let mut config: SurgeConfig = serde_yaml::from_str(content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SurgeConfig> {
        let mut config = SurgeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SurgeConfig) -> ConfigResult<()> {
        self.apply_target_overrides(&mut config.target)?;
        self.apply_health_check_overrides(&mut config.health_check)?;
        self.apply_load_overrides(&mut config.load)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply target config overrides
    fn apply_target_overrides(
        &self,
        config: &mut crate::domains::target::TargetConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("TARGET_URL") {
            config.url = url;
        }

        if let Ok(path) = self.get_env_var("SOCKETIO_PATH") {
            config.socketio_path = path;
        }

        if let Ok(namespace) = self.get_env_var("NAMESPACE") {
            config.namespace = namespace;
        }

        if let Ok(timeout) = self.get_env_var("CONNECT_TIMEOUT") {
            config.connect_timeout = parse_seconds(&timeout)
                .map_err(|e| ConfigError::EnvError(format!("Invalid CONNECT_TIMEOUT: {}", e)))?;
        }

        Ok(())
    }

    /// Apply health-check config overrides
    fn apply_health_check_overrides(
        &self,
        config: &mut crate::domains::health_check::HealthCheckConfig,
    ) -> ConfigResult<()> {
        if let Ok(user_id) = self.get_env_var("USER_ID") {
            config.user_id = user_id;
        }

        if let Ok(timeout) = self.get_env_var("REPLY_TIMEOUT") {
            config.reply_timeout = parse_seconds(&timeout)
                .map_err(|e| ConfigError::EnvError(format!("Invalid REPLY_TIMEOUT: {}", e)))?;
        }

        Ok(())
    }

    /// Apply load config overrides
    fn apply_load_overrides(
        &self,
        config: &mut crate::domains::load::LoadConfig,
    ) -> ConfigResult<()> {
        if let Ok(users) = self.get_env_var("USERS") {
            config.users = users
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid USERS: {}", e)))?;
        }

        if let Ok(rate) = self.get_env_var("SPAWN_RATE") {
            config.spawn_rate = rate
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SPAWN_RATE: {}", e)))?;
        }

        if let Ok(run_time) = self.get_env_var("RUN_TIME") {
            let run_time = parse_seconds(&run_time)
                .map_err(|e| ConfigError::EnvError(format!("Invalid RUN_TIME: {}", e)))?;
            config.run_time = Some(run_time);
        }

        if let Ok(role) = self.get_env_var("ROLE") {
            config.role = crate::domains::load::RoleConfig::from_str(&role)
                .map_err(|_| ConfigError::EnvError(format!("Invalid ROLE: {}", role)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

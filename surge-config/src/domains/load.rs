//! Load shape configuration: how many users, how fast, for how long

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Load shape configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Number of concurrent users to run
    #[serde(default = "default_users")]
    pub users: usize,

    /// Users started per second while ramping up
    #[serde(default = "default_spawn_rate")]
    pub spawn_rate: f64,

    /// Stop after this long; run until interrupted when unset
    #[serde(
        with = "crate::domains::utils::serde_duration_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub run_time: Option<Duration>,

    /// Pause between task executions of one user
    #[serde(default)]
    pub wait_time: WaitTimeConfig,

    /// Distributed role of this process
    #[serde(default)]
    pub role: RoleConfig,
}

/// Wait-time policy between two task executions of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitTimeConfig {
    /// Always wait the same amount
    Constant { seconds: f64 },
    /// Wait a uniformly random amount in `[min, max]`
    Between { min: f64, max: f64 },
    /// Wait so that iterations start `seconds` apart
    ConstantPacing { seconds: f64 },
}

/// Role of the process in a distributed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleConfig {
    /// Standalone process
    #[default]
    Local,
    /// Coordinator
    Master,
    /// Executor
    Worker,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            users: default_users(),
            spawn_rate: default_spawn_rate(),
            run_time: None,
            wait_time: WaitTimeConfig::default(),
            role: RoleConfig::default(),
        }
    }
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        WaitTimeConfig::Constant { seconds: 1.0 }
    }
}

impl fmt::Display for RoleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoleConfig::Local => "local",
            RoleConfig::Master => "master",
            RoleConfig::Worker => "worker",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for RoleConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(RoleConfig::Local),
            "master" | "coordinator" => Ok(RoleConfig::Master),
            "worker" | "executor" => Ok(RoleConfig::Worker),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl Validatable for LoadConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.users, "users", self.domain_name())?;
        validate_positive(self.spawn_rate, "spawn_rate", self.domain_name())?;

        if let Some(run_time) = self.run_time {
            validate_positive(run_time.as_secs_f64(), "run_time", self.domain_name())?;
        }

        self.wait_time.validate()?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load"
    }
}

impl Validatable for WaitTimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            WaitTimeConfig::Constant { seconds } | WaitTimeConfig::ConstantPacing { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    return Err(self.validation_error(format!(
                        "seconds must be a non-negative number, got {}",
                        seconds
                    )));
                }
            }
            WaitTimeConfig::Between { min, max } => {
                if !min.is_finite() || !max.is_finite() || *min < 0.0 {
                    return Err(self.validation_error(format!(
                        "min and max must be non-negative numbers, got {} and {}",
                        min, max
                    )));
                }
                if min > max {
                    return Err(self.validation_error(format!(
                        "min ({}) must not exceed max ({})",
                        min, max
                    )));
                }
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load.wait_time"
    }
}

// Default value functions
fn default_users() -> usize {
    1
}

fn default_spawn_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults() {
        let config = LoadConfig::default();
        assert_eq!(config.users, 1);
        assert_eq!(config.spawn_rate, 1.0);
        assert_eq!(config.run_time, None);
        assert_eq!(config.wait_time, WaitTimeConfig::Constant { seconds: 1.0 });
        assert_eq!(config.role, RoleConfig::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_validation() {
        let mut config = LoadConfig::default();
        config.users = 0;
        assert!(config.validate().is_err());

        config = LoadConfig::default();
        config.spawn_rate = 0.0;
        assert!(config.validate().is_err());

        config = LoadConfig::default();
        config.wait_time = WaitTimeConfig::Between { min: 3.0, max: 1.0 };
        assert!(config.validate().is_err());

        config.wait_time = WaitTimeConfig::ConstantPacing { seconds: -1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("MASTER".parse::<RoleConfig>().unwrap(), RoleConfig::Master);
        assert_eq!("executor".parse::<RoleConfig>().unwrap(), RoleConfig::Worker);
        assert_eq!("local".parse::<RoleConfig>().unwrap(), RoleConfig::Local);
        assert!("leader".parse::<RoleConfig>().is_err());
    }

    #[test]
    fn test_wait_time_yaml() {
        let wait: WaitTimeConfig = serde_yaml::from_str("type: between\nmin: 0.5\nmax: 2\n").unwrap();
        assert_eq!(wait, WaitTimeConfig::Between { min: 0.5, max: 2.0 });
    }
}

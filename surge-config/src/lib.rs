//! Domain-driven configuration for surge
//!
//! Configuration is split by functional domain (target endpoint, health-check
//! payload, load shape, logging), with validation, defaults, and environment
//! variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    health_check::HealthCheckConfig,
    load::{LoadConfig, RoleConfig, WaitTimeConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    target::TargetConfig,
    SurgeConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;

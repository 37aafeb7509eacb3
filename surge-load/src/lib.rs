//! Load generation for surge
//!
//! This crate provides the pieces needed to drive many concurrent users
//! against a socket.io endpoint: the user abstraction and its pacing, an
//! event environment that request listeners subscribe to, request
//! statistics, a ramping runner, and the concrete health-check user.

pub mod error;
pub mod events;
pub mod runner;
pub mod stats;
pub mod user;
pub mod users;

// Re-export commonly used types
pub use error::{HealthCheckError, LoadError};
pub use events::{log_runner_role, Environment, RequestEvent, RequestListener, RunnerRole};
pub use runner::{LoadRunner, RunParameters, RunSummary};
pub use stats::{RequestStats, StatsEntry, StatsReport};
pub use user::{User, UserBlueprint, WaitTime};
pub use users::{health_check::HealthCheckUser, socketio::SocketIoSession};

//! Event environment shared by the runner, users and listeners

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use surge_config::RoleConfig;
use tracing::info;

/// Role of this process in a distributed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerRole {
    /// Standalone process
    #[default]
    Local,
    /// Coordinator of a distributed run
    Master,
    /// Executor of a distributed run
    Worker,
}

impl RunnerRole {
    pub fn is_master(&self) -> bool {
        matches!(self, RunnerRole::Master)
    }
}

impl From<RoleConfig> for RunnerRole {
    fn from(role: RoleConfig) -> Self {
        match role {
            RoleConfig::Local => RunnerRole::Local,
            RoleConfig::Master => RunnerRole::Master,
            RoleConfig::Worker => RunnerRole::Worker,
        }
    }
}

impl fmt::Display for RunnerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerRole::Local => "local",
            RunnerRole::Master => "master",
            RunnerRole::Worker => "worker",
        };
        write!(f, "{}", name)
    }
}

/// One timed request sample
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    /// Protocol family, e.g. `socket.io`
    pub request_type: String,
    /// Logical request name
    pub name: String,
    /// Response time in milliseconds
    pub response_time: f64,
    /// Size of the response in characters
    pub response_length: usize,
    /// Failure description; `None` for a successful request
    pub exception: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestEvent {
    /// Successful request sample
    pub fn success(
        request_type: impl Into<String>,
        name: impl Into<String>,
        response_time: f64,
        response_length: usize,
    ) -> Self {
        Self {
            request_type: request_type.into(),
            name: name.into(),
            response_time,
            response_length,
            exception: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }
}

/// Subscriber to request samples and task errors
pub trait RequestListener: Send + Sync {
    /// Called once per reported request
    fn on_request(&self, event: &RequestEvent);

    /// Called when a user task fails without reporting a request
    fn on_task_error(&self, _user_class: &str, _error: &str) {}
}

type InitListener = Box<dyn Fn(&Environment) + Send + Sync>;

/// Shared run environment: role plus registered listeners
///
/// Listeners are registered while the environment is still owned, then the
/// environment is wrapped in an `Arc` and handed to the runner and users.
#[derive(Default)]
pub struct Environment {
    role: RunnerRole,
    init_listeners: Vec<InitListener>,
    request_listeners: Vec<Arc<dyn RequestListener>>,
}

impl Environment {
    pub fn new(role: RunnerRole) -> Self {
        Self {
            role,
            init_listeners: Vec::new(),
            request_listeners: Vec::new(),
        }
    }

    pub fn role(&self) -> RunnerRole {
        self.role
    }

    /// Register a listener fired once by `fire_init`
    pub fn add_init_listener<F>(&mut self, listener: F)
    where
        F: Fn(&Environment) + Send + Sync + 'static,
    {
        self.init_listeners.push(Box::new(listener));
    }

    /// Register a request listener
    pub fn add_request_listener(&mut self, listener: Arc<dyn RequestListener>) {
        self.request_listeners.push(listener);
    }

    /// Run every init listener
    pub fn fire_init(&self) {
        for listener in &self.init_listeners {
            listener(self);
        }
    }

    /// Deliver a request sample to every request listener
    pub fn fire_request(&self, event: RequestEvent) {
        for listener in &self.request_listeners {
            listener.on_request(&event);
        }
    }

    /// Deliver a task failure to every request listener
    pub fn fire_task_error(&self, user_class: &str, error: &str) {
        for listener in &self.request_listeners {
            listener.on_task_error(user_class, error);
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("role", &self.role)
            .field("init_listeners", &self.init_listeners.len())
            .field("request_listeners", &self.request_listeners.len())
            .finish()
    }
}

/// Message logged by `log_runner_role`
pub fn role_message(role: RunnerRole) -> &'static str {
    if role.is_master() {
        "Master initialized"
    } else {
        "Worker initialized"
    }
}

/// Init listener announcing the role of this process
pub fn log_runner_role(environment: &Environment) {
    info!(role = %environment.role(), "{}", role_message(environment.role()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<RequestEvent>>,
        errors: Mutex<Vec<String>>,
    }

    impl RequestListener for Recorder {
        fn on_request(&self, event: &RequestEvent) {
            self.requests.lock().unwrap().push(event.clone());
        }

        fn on_task_error(&self, user_class: &str, error: &str) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}: {}", user_class, error));
        }
    }

    #[test]
    fn test_role_message() {
        assert_eq!(role_message(RunnerRole::Master), "Master initialized");
        assert_eq!(role_message(RunnerRole::Worker), "Worker initialized");
        assert_eq!(role_message(RunnerRole::Local), "Worker initialized");
    }

    #[test]
    fn test_role_from_config() {
        assert_eq!(RunnerRole::from(RoleConfig::Master), RunnerRole::Master);
        assert_eq!(RunnerRole::from(RoleConfig::Worker), RunnerRole::Worker);
        assert_eq!(RunnerRole::from(RoleConfig::default()), RunnerRole::Local);
    }

    #[test]
    fn test_init_listeners_fire_once_each() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut environment = Environment::new(RunnerRole::Master);

        let counter = calls.clone();
        environment.add_init_listener(move |env| {
            assert!(env.role().is_master());
            counter.fetch_add(1, Ordering::SeqCst);
        });
        environment.add_init_listener(log_runner_role);

        environment.fire_init();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_listeners_receive_events() {
        let recorder = Arc::new(Recorder::default());
        let mut environment = Environment::new(RunnerRole::Local);
        environment.add_request_listener(recorder.clone());

        environment.fire_request(RequestEvent::success("socket.io", "health-check", 12.5, 80));
        environment.fire_task_error("HealthCheckUser", "Event name mismatch!");

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is_success());
        assert_eq!(requests[0].response_length, 80);
        assert_eq!(
            recorder.errors.lock().unwrap().as_slice(),
            ["HealthCheckUser: Event name mismatch!"]
        );
    }
}

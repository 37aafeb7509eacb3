//! User abstraction, pacing policies and user classes

use crate::error::LoadError;
use crate::events::Environment;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use surge_config::WaitTimeConfig;

/// One simulated user
///
/// The runner calls `on_start` once, then `run_task` repeatedly with the
/// class wait time in between, and `on_stop` once when the run ends.
#[async_trait::async_trait]
pub trait User: Send {
    async fn on_start(&mut self) {}

    /// Execute one task iteration
    async fn run_task(&mut self) -> anyhow::Result<()>;

    async fn on_stop(&mut self) {}
}

/// Pause between two task executions of one user
#[derive(Debug, Clone, PartialEq)]
pub enum WaitTime {
    /// Always wait the same amount
    Constant(Duration),
    /// Uniformly random wait in `[min, max]`
    Between(Duration, Duration),
    /// Start iterations a fixed interval apart, regardless of task duration
    ConstantPacing(Duration),
}

impl Default for WaitTime {
    fn default() -> Self {
        WaitTime::Constant(Duration::from_secs(1))
    }
}

impl WaitTime {
    /// Wait after an iteration whose task took `task_elapsed`
    pub fn next_wait(&self, task_elapsed: Duration) -> Duration {
        match self {
            WaitTime::Constant(wait) => *wait,
            WaitTime::Between(min, max) => {
                if max <= min {
                    *min
                } else {
                    *min + (*max - *min).mul_f64(fastrand::f64())
                }
            }
            WaitTime::ConstantPacing(interval) => interval.saturating_sub(task_elapsed),
        }
    }
}

impl From<&WaitTimeConfig> for WaitTime {
    fn from(config: &WaitTimeConfig) -> Self {
        let secs = |s: f64| Duration::try_from_secs_f64(s).unwrap_or_default();
        match *config {
            WaitTimeConfig::Constant { seconds } => WaitTime::Constant(secs(seconds)),
            WaitTimeConfig::Between { min, max } => WaitTime::Between(secs(min), secs(max)),
            WaitTimeConfig::ConstantPacing { seconds } => WaitTime::ConstantPacing(secs(seconds)),
        }
    }
}

/// Builds a user instance from its index and the shared environment
pub type UserFactory = Arc<dyn Fn(usize, Arc<Environment>) -> Box<dyn User> + Send + Sync>;

/// A user class: name, pacing and how to build instances
///
/// Abstract classes carry shared behavior only and are never scheduled.
#[derive(Clone)]
pub struct UserBlueprint {
    name: String,
    wait_time: WaitTime,
    factory: Option<UserFactory>,
}

impl UserBlueprint {
    /// Concrete user class
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(usize, Arc<Environment>) -> Box<dyn User> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            wait_time: WaitTime::default(),
            factory: Some(Arc::new(factory)),
        }
    }

    /// Abstract user class
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wait_time: WaitTime::default(),
            factory: None,
        }
    }

    pub fn with_wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wait_time(&self) -> &WaitTime {
        &self.wait_time
    }

    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    /// Build user number `index`
    pub fn spawn(&self, index: usize, environment: Arc<Environment>) -> Result<Box<dyn User>, LoadError> {
        match self.factory {
            Some(ref factory) => Ok(factory(index, environment)),
            None => Err(LoadError::AbstractUser(self.name.clone())),
        }
    }
}

impl fmt::Debug for UserBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserBlueprint")
            .field("name", &self.name)
            .field("wait_time", &self.wait_time)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

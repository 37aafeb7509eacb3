//! Local runner: ramps users up, paces their tasks and stops them

use crate::error::LoadError;
use crate::events::Environment;
use crate::user::{User, UserBlueprint, WaitTime};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use surge_config::LoadConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Shape of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    /// Number of users to start
    pub users: usize,
    /// Users started per second
    pub spawn_rate: f64,
    /// Stop after this long; `None` runs until the shutdown future resolves
    pub run_time: Option<Duration>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            users: 1,
            spawn_rate: 1.0,
            run_time: None,
        }
    }
}

impl From<&LoadConfig> for RunParameters {
    fn from(config: &LoadConfig) -> Self {
        Self {
            users: config.users,
            spawn_rate: config.spawn_rate,
            run_time: config.run_time,
        }
    }
}

impl RunParameters {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.users == 0 {
            return Err(LoadError::InvalidParameters("users must be at least 1".to_string()));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(LoadError::InvalidParameters(format!(
                "spawn_rate must be positive, got {}",
                self.spawn_rate
            )));
        }
        if self.run_time == Some(Duration::ZERO) {
            return Err(LoadError::InvalidParameters("run_time must be positive".to_string()));
        }
        Ok(())
    }

    /// Delay between two consecutive user starts
    ///
    /// Rates too small to express as a delay saturate to `Duration::MAX`.
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).unwrap_or(Duration::MAX)
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub users_spawned: usize,
    /// Whether the shutdown future ended the run before its run time
    pub interrupted: bool,
}

/// Runs user classes in-process
pub struct LoadRunner {
    environment: Arc<Environment>,
    parameters: RunParameters,
    user_classes: Vec<UserBlueprint>,
}

impl LoadRunner {
    pub fn new(environment: Arc<Environment>, parameters: RunParameters) -> Self {
        Self {
            environment,
            parameters,
            user_classes: Vec::new(),
        }
    }

    /// Register a user class; abstract classes are rejected
    pub fn add_user_class(&mut self, blueprint: UserBlueprint) -> Result<(), LoadError> {
        if blueprint.is_abstract() {
            return Err(LoadError::AbstractUser(blueprint.name().to_string()));
        }
        debug!(class = blueprint.name(), "Registered user class");
        self.user_classes.push(blueprint);
        Ok(())
    }

    /// Run until the run time elapses or `shutdown` resolves
    ///
    /// Users are assigned to classes round-robin. On stop every user finishes
    /// its current iteration, then runs `on_stop`.
    pub async fn run<F>(&self, shutdown: F) -> Result<RunSummary, LoadError>
    where
        F: Future<Output = ()>,
    {
        if self.user_classes.is_empty() {
            return Err(LoadError::NoUserClasses);
        }
        self.parameters.validate()?;

        let started_at = Utc::now();
        let started = Instant::now();
        // A run time beyond the clock's range means no deadline
        let deadline = self
            .parameters
            .run_time
            .and_then(|run_time| started.checked_add(run_time));
        let spawn_interval = self.parameters.spawn_interval();
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::pin!(shutdown);

        info!(
            users = self.parameters.users,
            spawn_rate = self.parameters.spawn_rate,
            run_time = ?self.parameters.run_time,
            role = %self.environment.role(),
            "Ramping up users"
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.parameters.users);
        let mut interrupted = false;
        let mut expired = false;

        for index in 0..self.parameters.users {
            let blueprint = &self.user_classes[index % self.user_classes.len()];
            let user = match blueprint.spawn(index, self.environment.clone()) {
                Ok(user) => user,
                Err(e) => {
                    let _ = stop_tx.send(true);
                    join_users(handles).await;
                    return Err(e);
                }
            };

            handles.push(tokio::spawn(run_user(
                index,
                blueprint.name().to_string(),
                user,
                blueprint.wait_time().clone(),
                self.environment.clone(),
                stop_rx.clone(),
            )));

            if index + 1 == self.parameters.users {
                break;
            }

            tokio::select! {
                _ = sleep(spawn_interval) => {}
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
                _ = wait_for(deadline) => {
                    expired = true;
                    break;
                }
            }
        }

        let users_spawned = handles.len();
        if users_spawned == self.parameters.users {
            info!(users = users_spawned, "All users spawned");
        }

        if !interrupted && !expired {
            tokio::select! {
                _ = &mut shutdown => interrupted = true,
                _ = wait_for(deadline) => {}
            }
        }

        if interrupted {
            info!("Shutdown requested, stopping users");
        } else {
            info!("Run time limit reached, stopping users");
        }

        let _ = stop_tx.send(true);
        join_users(handles).await;

        let elapsed = started.elapsed();
        info!(elapsed_secs = elapsed.as_secs_f64(), "Run finished");

        Ok(RunSummary {
            started_at,
            elapsed,
            users_spawned,
            interrupted,
        })
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_users(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!("User task aborted: {}", e);
        }
    }
}

async fn run_user(
    index: usize,
    class_name: String,
    mut user: Box<dyn User>,
    wait_time: WaitTime,
    environment: Arc<Environment>,
    mut stop: watch::Receiver<bool>,
) {
    debug!(user = index, class = %class_name, "User starting");
    user.on_start().await;

    while !*stop.borrow() {
        let iteration = Instant::now();

        if let Err(e) = user.run_task().await {
            warn!(user = index, class = %class_name, "Task failed: {}", e);
            environment.fire_task_error(&class_name, &e.to_string());
        }

        let wait = wait_time.next_wait(iteration.elapsed());
        tokio::select! {
            _ = sleep(wait) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    user.on_stop().await;
    debug!(user = index, class = %class_name, "User stopped");
}

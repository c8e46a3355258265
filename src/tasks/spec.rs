//! # Task specification.
//!
//! Defines [`TaskConfig`] (execution parameters validated at declaration time)
//! and [`TaskSpec`], which binds a task body to its parameters.
//!
//! ## Rules
//! - `workers >= 1`
//! - `sleep_interval >= 0` seconds (finite)
//! - specs are registered on a [`ServiceBuilder`](crate::ServiceBuilder) and
//!   instantiated when the owning service starts

use std::time::Duration;

use crate::error::ConfigError;
use crate::tasks::task::TaskRef;

/// Execution parameters of a service task.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use servicevisor::TaskConfig;
///
/// let cfg = TaskConfig::new(true, 0.5, 3).unwrap();
/// assert_eq!(cfg.sleep_interval(), Duration::from_millis(500));
/// assert_eq!(cfg.workers(), 3);
///
/// assert!(TaskConfig::new(true, -1.0, 1).is_err());
/// assert!(TaskConfig::default().with_workers(0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    periodic: bool,
    sleep_interval: Duration,
    workers: usize,
}

impl TaskConfig {
    /// Creates a validated config.
    ///
    /// ### Parameters
    /// - `periodic`: re-run the body after each invocation
    /// - `sleep_interval_secs`: pause between periodic runs
    /// - `workers`: number of concurrent units
    pub fn new(
        periodic: bool,
        sleep_interval_secs: f64,
        workers: usize,
    ) -> Result<Self, ConfigError> {
        if workers < 1 {
            return Err(ConfigError::ZeroWorkers);
        }
        if !sleep_interval_secs.is_finite() || sleep_interval_secs < 0.0 {
            return Err(ConfigError::InvalidInterval {
                secs: sleep_interval_secs,
            });
        }
        Ok(Self {
            periodic,
            sleep_interval: Duration::from_secs_f64(sleep_interval_secs),
            workers,
        })
    }

    /// Single-invocation task with one worker.
    pub fn one_shot() -> Self {
        Self {
            periodic: false,
            ..Self::default()
        }
    }

    /// Periodic task with one worker sleeping `interval` between runs.
    pub fn every(interval: Duration) -> Self {
        Self {
            sleep_interval: interval,
            ..Self::default()
        }
    }

    /// Returns a config with a different number of workers.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if workers < 1 {
            return Err(ConfigError::ZeroWorkers);
        }
        self.workers = workers;
        Ok(self)
    }

    /// True when the body is re-invoked after each run.
    pub fn periodic(&self) -> bool {
        self.periodic
    }

    /// Pause between periodic runs.
    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    /// Number of concurrent units.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for TaskConfig {
    /// `periodic = true`, `sleep_interval = 100ms`, `workers = 1`.
    fn default() -> Self {
        Self {
            periodic: true,
            sleep_interval: Duration::from_millis(100),
            workers: 1,
        }
    }
}

/// A task body bound to its execution parameters.
#[derive(Clone)]
pub struct TaskSpec {
    task: TaskRef,
    config: TaskConfig,
}

impl TaskSpec {
    /// Creates a new task specification.
    pub fn new(task: TaskRef, config: TaskConfig) -> Self {
        Self { task, config }
    }

    /// Returns reference to the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Convenience: returns the task name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Returns the execution parameters.
    pub fn config(&self) -> TaskConfig {
        self.config
    }

    /// Deterministic unit name for worker `index` of this task on `service`.
    pub fn unit_name(&self, service: &str, index: usize) -> String {
        format!("{service}.{}.{index}", self.name())
    }
}

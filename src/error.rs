//! Error types used by services, their tasks and the bus.
//!
//! This module defines three enums:
//!
//! - [`ServiceError`]: lifecycle errors raised by `start`/`stop`/`healthcheck`
//!   and by nested-service resolution.
//! - [`TaskError`]: errors returned by task bodies, bus listeners and
//!   requirement providers.
//! - [`ConfigError`]: declaration-time rejections (bad task parameters,
//!   duplicate names).
//!
//! All of them provide `as_label` for logs.

use thiserror::Error;

/// # Errors produced by the service lifecycle.
///
/// Startup failures are reported after rollback has completed, so a caller
/// that sees an error from `start()` may assume the service is not running.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Healthcheck failed; the monitoring loop answers this by stopping the service.
    #[error("service '{service}' is unhealthy: {reason}")]
    Unhealthy {
        /// Service that reported the failure.
        service: String,
        /// What was found to be wrong.
        reason: String,
    },

    /// A nested service failed to start or failed its post-start healthcheck.
    #[error("nested service '{service}' failed to start: {source}")]
    Startup {
        /// Nested service that failed.
        service: String,
        /// Underlying failure.
        #[source]
        source: Box<ServiceError>,
    },

    /// A task unit finished with an error (not a cancellation).
    #[error("task unit '{unit}' failed: {source}")]
    UnexpectedTask {
        /// Deterministic unit name (`service.task.index`).
        unit: String,
        /// Error returned by the unit.
        #[source]
        source: TaskError,
    },

    /// Requirement providers wait on each other.
    #[error("cannot resolve requirements of '{service}': {unresolved:?} depend on each other")]
    DependencyCycle {
        /// Owning service.
        service: String,
        /// Providers that could not be scheduled.
        unresolved: Vec<String>,
    },

    /// A provider names a prerequisite that was never declared.
    #[error("requirement '{provider}' of '{service}' depends on undeclared '{missing}'")]
    MissingRequirement {
        /// Owning service.
        service: String,
        /// Provider with the dangling reference.
        provider: String,
        /// Name that does not exist.
        missing: String,
    },

    /// A provider failed or returned something that cannot be collected.
    #[error("requirement '{provider}' of '{service}' returned invalid services: {reason}")]
    InvalidRequirements {
        /// Owning service.
        service: String,
        /// Offending provider.
        provider: String,
        /// Details.
        reason: String,
    },

    /// Bus operation on a service that has no bus attached.
    #[error("no bus attached to service '{service}'")]
    BusNotAttached {
        /// Service that was asked to publish.
        service: String,
    },

    /// Programmer error (double start, restart after stop, ...).
    #[error("misuse of service '{service}': {reason}")]
    Misuse {
        /// Service that was misused.
        service: String,
        /// Description of the misuse.
        reason: &'static str,
    },

    /// Free-form failure from a user-implemented lifecycle method.
    #[error("service '{service}' failed: {error}")]
    Failed {
        /// Service that failed.
        service: String,
        /// The underlying error message.
        error: String,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::ServiceError;
    ///
    /// let err = ServiceError::Unhealthy { service: "db".into(), reason: "not running".into() };
    /// assert_eq!(err.as_label(), "service_unhealthy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Unhealthy { .. } => "service_unhealthy",
            ServiceError::Startup { .. } => "service_startup_failed",
            ServiceError::UnexpectedTask { .. } => "service_unexpected_task",
            ServiceError::DependencyCycle { .. } => "service_dependency_cycle",
            ServiceError::MissingRequirement { .. } => "service_missing_requirement",
            ServiceError::InvalidRequirements { .. } => "service_invalid_requirements",
            ServiceError::BusNotAttached { .. } => "service_bus_not_attached",
            ServiceError::Misuse { .. } => "service_misuse",
            ServiceError::Failed { .. } => "service_failed",
        }
    }

    /// Shorthand for [`ServiceError::Unhealthy`].
    pub fn unhealthy(service: impl Into<String>, reason: impl Into<String>) -> Self {
        ServiceError::Unhealthy {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ServiceError::Failed`].
    pub fn failed(service: impl Into<String>, error: impl Into<String>) -> Self {
        ServiceError::Failed {
            service: service.into(),
            error: error.into(),
        }
    }

    /// True for [`ServiceError::Unhealthy`].
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, ServiceError::Unhealthy { .. })
    }

    /// True for configuration errors detected while resolving nested services.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ServiceError::DependencyCycle { .. }
                | ServiceError::MissingRequirement { .. }
                | ServiceError::InvalidRequirements { .. }
        )
    }
}

/// # Errors produced by task bodies, listeners and providers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The body panicked; the panic was caught at the unit boundary.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The unit observed shutdown and gave up; not a failure.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servicevisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// True for [`TaskError::Canceled`], which supervisors treat as a clean exit.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }

    /// Renders a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        TaskError::Panicked { info }
    }
}

/// # Errors rejected at declaration time.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `workers` must be at least 1.
    #[error("number of task workers should be >= 1")]
    ZeroWorkers,

    /// `sleep_interval` must be a finite number of seconds >= 0.
    #[error("sleep interval should be >= 0 seconds, got {secs}")]
    InvalidInterval {
        /// Rejected value.
        secs: f64,
    },

    /// Two tasks registered under the same name on one service.
    #[error("task '{name}' is already registered")]
    DuplicateTask {
        /// Conflicting name.
        name: String,
    },

    /// Two requirement providers registered under the same name on one service.
    #[error("requirement provider '{name}' is already registered")]
    DuplicateProvider {
        /// Conflicting name.
        name: String,
    },

    /// A listener was declared without any message type.
    #[error("listener '{name}' has no message types")]
    EmptyListenerTypes {
        /// Listener name.
        name: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroWorkers => "config_zero_workers",
            ConfigError::InvalidInterval { .. } => "config_invalid_interval",
            ConfigError::DuplicateTask { .. } => "config_duplicate_task",
            ConfigError::DuplicateProvider { .. } => "config_duplicate_provider",
            ConfigError::EmptyListenerTypes { .. } => "config_empty_listener_types",
        }
    }
}

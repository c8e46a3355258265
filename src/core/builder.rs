//! # ServiceBuilder: static registration of a service's parts.
//!
//! Every task, requirement provider and bus listener is declared here, before
//! the service exists. Names are checked as they are registered, so a
//! duplicate is rejected at the call that introduces it.
//!
//! ```text
//! BaseService::builder("ingest")
//!     .with_config(cfg)            ServiceConfig (monitoring interval, runtime, ...)
//!     .with_bus(bus)               shared ServiceBus (optional)
//!     .task(spec)?                 TaskSpec → workers at start
//!     .requirements(provider)?     RequirementProvider → nested services at start
//!     .listener::<Msg, _, _>(..)   typed bus listener
//!     .with_healthcheck(..)        extra check aggregated into healthcheck()
//!     .build()                     subscribes to the bus, returns BaseService
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::{Envelope, ListenerTable, ServiceBus, TypeKey};
use crate::config::ServiceConfig;
use crate::error::{ConfigError, ServiceError, TaskError};
use crate::nested::RequirementProvider;
use crate::tasks::{TaskConfig, TaskFn, TaskSpec};

use super::base::{BaseService, HealthCheckFn, Parts};

/// Builder for [`BaseService`].
pub struct ServiceBuilder {
    name: String,
    config: ServiceConfig,
    specs: Vec<TaskSpec>,
    providers: Vec<RequirementProvider>,
    listeners: ListenerTable,
    bus: Option<ServiceBus>,
    health: Option<HealthCheckFn>,
}

impl ServiceBuilder {
    /// Creates an empty declaration for a service named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ServiceConfig::default(),
            specs: Vec::new(),
            providers: Vec::new(),
            listeners: ListenerTable::default(),
            bus: None,
            health: None,
        }
    }

    /// Replaces the service configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a (possibly shared) bus.
    ///
    /// Without it, a service that declares listeners gets a private bus.
    pub fn with_bus(mut self, bus: ServiceBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Registers a task.
    pub fn task(mut self, spec: TaskSpec) -> Result<Self, ConfigError> {
        if self.specs.iter().any(|s| s.name() == spec.name()) {
            return Err(ConfigError::DuplicateTask {
                name: spec.name().to_string(),
            });
        }
        self.specs.push(spec);
        Ok(self)
    }

    /// Registers a closure as a task.
    pub fn task_fn<F, Fut>(
        self,
        name: impl Into<Cow<'static, str>>,
        config: TaskConfig,
        f: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.task(TaskSpec::new(TaskFn::arc(name, f), config))
    }

    /// Registers a requirement provider.
    pub fn requirements(mut self, provider: RequirementProvider) -> Result<Self, ConfigError> {
        if self.providers.iter().any(|p| p.name() == provider.name()) {
            return Err(ConfigError::DuplicateProvider {
                name: provider.name().to_string(),
            });
        }
        self.providers.push(provider);
        Ok(self)
    }

    /// Registers a listener for bus messages of type `M`.
    pub fn listener<M, F, Fut>(mut self, name: &str, f: F) -> Self
    where
        M: Any + Send + Sync,
        F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.listeners.add::<M, F, Fut>(name, f);
        self
    }

    /// Registers one listener for several message types.
    pub fn listener_for<F, Fut>(
        mut self,
        name: &str,
        keys: &[TypeKey],
        f: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.listeners.add_for(name, keys, f)?;
        Ok(self)
    }

    /// Adds a check that runs after the built-in ones in every `healthcheck()`.
    pub fn with_healthcheck<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        self.health = Some(Arc::new(move || -> BoxFuture<'static, Result<(), ServiceError>> {
            Box::pin(f())
        }));
        self
    }

    /// Builds the service, subscribing its listeners to the bus.
    pub fn build(self) -> BaseService {
        let bus = match self.bus {
            Some(bus) => Some(bus),
            None if !self.listeners.is_empty() => {
                debug!(
                    service = %self.name,
                    "listeners declared without a bus, using a private one"
                );
                Some(ServiceBus::new())
            }
            None => None,
        };
        let queue = match &bus {
            Some(bus) if !self.listeners.is_empty() => {
                Some(bus.subscribe(&self.name, self.listeners.keys()))
            }
            _ => None,
        };

        BaseService::from_parts(Parts {
            name: self.name,
            config: self.config,
            specs: self.specs,
            providers: self.providers,
            bus,
            queue,
            listeners: self.listeners,
            health: self.health,
        })
    }
}

impl std::fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tasks: Vec<&str> = self.specs.iter().map(TaskSpec::name).collect();
        let providers: Vec<&str> = self.providers.iter().map(RequirementProvider::name).collect();
        f.debug_struct("ServiceBuilder")
            .field("name", &self.name)
            .field("tasks", &tasks)
            .field("providers", &providers)
            .field("listener_types", &self.listeners.keys().len())
            .field("bus", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}

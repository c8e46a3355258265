//! # BaseService: the concrete service.
//!
//! Composes, by ownership, everything a service runs:
//!
//! ```text
//! BaseService
//!   └─ Arc<ServiceCore> (shared with the monitoring loop)
//!        ├─ specs ──────────► TaskCollection    (workers: service.task.index)
//!        ├─ bus queue ──────► TaskCollection    (reader:  service.bus_reader)
//!        ├─ providers ──────► ServiceCollection (nested services, started prefix)
//!        ├─ user healthcheck
//!        └─ should_stop: CancellationToken (monotonic)
//! ```
//!
//! ## Lifecycle
//! ```text
//! start():  misuse checks
//!           ├─► spawn task workers
//!           ├─► spawn bus reader (if subscribed)
//!           ├─► resolve providers ──► start nested (rollback inside on failure)
//!           │     └─ Err → should_stop, stop reader + tasks, return Err
//!           ├─► running = true
//!           └─► spawn monitoring loop
//!
//! stop():   should_stop + running = false (immediately)
//!           ├─► stop nested (reverse start order)
//!           ├─► stop bus reader
//!           └─► stop task workers
//! ```
//!
//! `start()` and `stop()` are serialized by a lifecycle lock. A stopped service
//! stays stopped: `should_stop` is never reset, so a second `start()` is a
//! [`ServiceError::Misuse`].

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, Weak};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::bus::{BusQueue, BusReader, ListenerTable, ServiceBus};
use crate::config::{ExitDetection, ServiceConfig};
use crate::error::ServiceError;
use crate::nested::{self, RequirementProvider, ServiceCollection};
use crate::tasks::{TaskCollection, TaskSpec, Worker};

use super::builder::ServiceBuilder;
use super::service::{Service, ServiceRef};
use super::{monitor, shutdown};

/// User-supplied check aggregated into `healthcheck()`.
pub(crate) type HealthCheckFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// Everything owned by the running side of a service.
#[derive(Default)]
struct Runtime {
    tasks: TaskCollection,
    reader: TaskCollection,
    nested: ServiceCollection,
}

/// Declared parts of a service, as assembled by the builder.
pub(crate) struct Parts {
    pub name: String,
    pub config: ServiceConfig,
    pub specs: Vec<TaskSpec>,
    pub providers: Vec<RequirementProvider>,
    pub bus: Option<ServiceBus>,
    pub queue: Option<BusQueue>,
    pub listeners: ListenerTable,
    pub health: Option<HealthCheckFn>,
}

pub(crate) struct ServiceCore {
    name: Arc<str>,
    config: ServiceConfig,
    specs: Vec<TaskSpec>,
    providers: Vec<RequirementProvider>,
    bus: Option<ServiceBus>,
    listeners: Arc<ListenerTable>,
    health: Option<HealthCheckFn>,

    /// Taken by the first start; a reader is spawned at most once.
    queue: std::sync::Mutex<Option<BusQueue>>,
    /// Outer service the monitoring loop checks and stops instead of the core.
    owner: std::sync::Mutex<Option<Weak<dyn Service>>>,
    running: AtomicBool,
    should_stop: CancellationToken,
    exit_notify: Arc<Notify>,
    state: Mutex<Runtime>,
}

impl ServiceCore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn should_stop_token(&self) -> CancellationToken {
        self.should_stop.clone()
    }

    pub fn exit_notify(&self) -> &Notify {
        &self.exit_notify
    }

    /// The bound outer service, while it is still alive.
    pub fn owner(&self) -> Option<ServiceRef> {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn misuse(&self, reason: &'static str) -> ServiceError {
        ServiceError::Misuse {
            service: self.name.to_string(),
            reason,
        }
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        let mut rt = self.state.lock().await;
        if self.running.load(Ordering::SeqCst) {
            return Err(self.misuse("service is already running"));
        }
        if self.should_stop.is_cancelled() {
            return Err(self.misuse("stopped service cannot be started again"));
        }
        debug!(service = %self.name, "starting");

        self.start_tasks(&mut rt);
        self.start_bus_reader(&mut rt);

        if let Err(e) = self.start_nested(&mut rt).await {
            error!(
                service = %self.name,
                error = %e,
                label = e.as_label(),
                "failed to start nested services"
            );
            self.should_stop.cancel();
            self.running.store(false, Ordering::SeqCst);
            rt.reader.stop_all().await;
            rt.tasks.stop_all().await;
            return Err(e);
        }

        self.running.store(true, Ordering::SeqCst);
        self.config.spawn(monitor::run(Arc::clone(self)));
        info!(
            service = %self.name,
            units = rt.tasks.len(),
            nested = rt.nested.len(),
            "service was started"
        );
        Ok(())
    }

    fn start_tasks(&self, rt: &mut Runtime) {
        let notify = match self.config.exit_detection {
            ExitDetection::Immediate => Some(Arc::clone(&self.exit_notify)),
            ExitDetection::Poll => None,
        };
        for spec in &self.specs {
            for index in 0..spec.config().workers() {
                let unit: Arc<str> = Arc::from(spec.unit_name(&self.name, index));
                let worker = Worker {
                    task: Arc::clone(spec.task()),
                    config: spec.config(),
                    unit: Arc::clone(&unit),
                    exit_notify: notify.clone(),
                };
                rt.tasks.spawn(&self.config, unit, worker.run(self.should_stop.clone()));
            }
        }
        debug!(service = %self.name, units = rt.tasks.len(), "service tasks started");
    }

    fn start_bus_reader(&self, rt: &mut Runtime) {
        let queue = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(queue) = queue else {
            return;
        };

        let reader = BusReader {
            service: Arc::clone(&self.name),
            queue,
            listeners: Arc::clone(&self.listeners),
        };
        let should_stop = self.should_stop.clone();
        let notify = (self.config.exit_detection == ExitDetection::Immediate)
            .then(|| Arc::clone(&self.exit_notify));
        let unit: Arc<str> = Arc::from(format!("{}.bus_reader", self.name));

        rt.reader.spawn(&self.config, unit, async move {
            let res = reader.run(should_stop).await;
            if let (Err(_), Some(notify)) = (&res, notify) {
                notify.notify_one();
            }
            res
        });
        debug!(service = %self.name, "bus reader started");
    }

    async fn start_nested(&self, rt: &mut Runtime) -> Result<(), ServiceError> {
        if self.providers.is_empty() {
            return Ok(());
        }
        let services = nested::resolve(&self.name, &self.providers).await?;
        rt.nested = ServiceCollection::new(services);
        rt.nested.start_all(&self.name).await
    }

    pub async fn stop(&self) -> Result<(), ServiceError> {
        self.should_stop.cancel();
        let was_running = self.running.swap(false, Ordering::SeqCst);

        let mut rt = self.state.lock().await;
        rt.nested.stop_all(&self.name).await;
        rt.reader.stop_all().await;
        rt.tasks.stop_all().await;

        if was_running {
            info!(service = %self.name, "service was stopped");
        } else {
            debug!(service = %self.name, "service was not running");
        }
        Ok(())
    }

    pub async fn healthcheck(&self) -> Result<(), ServiceError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ServiceError::unhealthy(&*self.name, "service is not running"));
        }

        {
            let mut rt = self.state.lock().await;
            if let Err(e) = rt.tasks.check_all().await {
                error!(
                    service = %self.name,
                    error = %e,
                    label = e.as_label(),
                    "service tasks healthcheck failed"
                );
                return Err(ServiceError::unhealthy(&*self.name, e.to_string()));
            }
            if let Err(e) = rt.reader.check_all().await {
                error!(
                    service = %self.name,
                    error = %e,
                    label = e.as_label(),
                    "bus reader stopped unexpectedly"
                );
                return Err(ServiceError::unhealthy(&*self.name, e.to_string()));
            }
            if let Err(e) = rt.nested.healthcheck().await {
                return Err(ServiceError::unhealthy(
                    &*self.name,
                    format!("nested service failed: {e}"),
                ));
            }
        }

        match &self.health {
            Some(check) => check().await,
            None => Ok(()),
        }
    }
}

/// The ready-made [`Service`] implementation.
///
/// Built with [`BaseService::builder`]. Dropping a running `BaseService` is a
/// programmer error: it is logged and the service's units are told to wind down.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use servicevisor::{BaseService, Service, TaskConfig, TaskError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let svc = BaseService::builder("ticker")
///         .task_fn("tick", TaskConfig::every(Duration::from_millis(10)), |_ctx| async {
///             Ok::<_, TaskError>(())
///         })?
///         .build();
///
///     svc.start().await?;
///     assert_eq!(svc.unit_names().await, vec!["ticker.tick.0".to_string()]);
///     svc.stop().await?;
///     assert!(!svc.is_running());
///     Ok(())
/// }
/// ```
pub struct BaseService {
    core: Arc<ServiceCore>,
}

impl BaseService {
    /// Starts declaring a service named `name`.
    pub fn builder(name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder::new(name)
    }

    pub(crate) fn from_parts(parts: Parts) -> Self {
        Self {
            core: Arc::new(ServiceCore {
                name: Arc::from(parts.name),
                config: parts.config,
                specs: parts.specs,
                providers: parts.providers,
                bus: parts.bus,
                listeners: Arc::new(parts.listeners),
                health: parts.health,
                queue: std::sync::Mutex::new(parts.queue),
                owner: std::sync::Mutex::new(None),
                running: AtomicBool::new(false),
                should_stop: CancellationToken::new(),
                exit_notify: Arc::new(Notify::new()),
                state: Mutex::new(Runtime::default()),
            }),
        }
    }

    /// Binds the service that wraps this one.
    ///
    /// The monitoring loop then runs `owner.healthcheck()` and escalates with
    /// `owner.stop()`, so the wrapper's overrides take part. Only a weak
    /// reference is kept; once the owner is dropped the loop falls back to
    /// this service. Usually called from [`Arc::new_cyclic`].
    pub fn set_owner<S: Service>(&self, owner: Weak<S>) {
        let owner: Weak<dyn Service> = owner;
        *self.core.owner.lock().unwrap_or_else(PoisonError::into_inner) = Some(owner);
    }

    /// Bus attached to this service, if any.
    pub fn bus(&self) -> Option<&ServiceBus> {
        self.core.bus.as_ref()
    }

    /// Publishes `msg` on the attached bus; returns the number of queues reached.
    pub fn publish<M: Any + Send + Sync>(&self, msg: M) -> Result<usize, ServiceError> {
        match &self.core.bus {
            Some(bus) => Ok(bus.publish(msg)),
            None => Err(ServiceError::BusNotAttached {
                service: self.core.name.to_string(),
            }),
        }
    }

    /// True once shutdown has begun. Never resets.
    pub fn should_stop(&self) -> bool {
        self.core.should_stop.is_cancelled()
    }

    /// Completes when the service begins shutting down, for whatever reason.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + 'static {
        self.core.should_stop.clone().cancelled_owned()
    }

    /// Names of tracked task units (including finished ones not yet pruned).
    pub async fn unit_names(&self) -> Vec<String> {
        self.core.state.lock().await.tasks.names()
    }

    /// Number of task units still executing.
    pub async fn live_units(&self) -> usize {
        self.core.state.lock().await.tasks.live()
    }

    /// Names of started nested services, in start order.
    pub async fn nested_services(&self) -> Vec<String> {
        self.core.state.lock().await.nested.started_names()
    }

    /// Starts the service, then waits for an OS termination signal or for the
    /// service to stop on its own, and stops it.
    pub async fn run_until_shutdown(&self) -> Result<(), ServiceError> {
        self.start().await?;
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => match res {
                Ok(()) => info!(service = %self.core.name, "shutdown signal received"),
                Err(e) => error!(
                    service = %self.core.name,
                    error = %e,
                    "failed to listen for shutdown signals"
                ),
            },
            _ = self.stopped() => debug!(service = %self.core.name, "service stopped on its own"),
        }
        self.stop().await
    }
}

#[async_trait]
impl Service for BaseService {
    fn name(&self) -> &str {
        self.core.name()
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.core.start().await
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.core.stop().await
    }

    async fn healthcheck(&self) -> Result<(), ServiceError> {
        self.core.healthcheck().await
    }

    fn is_running(&self) -> bool {
        self.core.running.load(Ordering::SeqCst)
    }
}

impl Drop for BaseService {
    fn drop(&mut self) {
        if self.core.running.swap(false, Ordering::SeqCst) {
            error!(service = %self.core.name, "service is not stopped correctly");
            self.core.should_stop.cancel();
        }
    }
}

impl std::fmt::Debug for BaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseService")
            .field("name", &self.core.name)
            .field("running", &self.is_running())
            .field("should_stop", &self.should_stop())
            .finish_non_exhaustive()
    }
}

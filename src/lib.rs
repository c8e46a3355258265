//! # servicevisor
//!
//! **Servicevisor** composes long-lived async services: units of work with an
//! explicit start/stop lifecycle that can own nested services, run supervised
//! background tasks, watch their own health and talk to each other over a typed
//! in-process bus.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       ┌──────────────────────────────┐
//!                       │  ServiceBuilder              │
//!                       │  - TaskSpec (tasks)          │
//!                       │  - RequirementProvider       │
//!                       │  - listeners (by TypeKey)    │
//!                       └──────────────┬───────────────┘
//!                                      ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  BaseService                                                       │
//! │  - TaskCollection   (workers: service.task.index)                  │
//! │  - bus reader       (drains this service's BusQueue)               │
//! │  - ServiceCollection (nested services, started prefix)             │
//! │  - monitoring loop  (healthcheck every monitoring_interval)        │
//! └──────┬──────────────────────┬────────────────────────┬─────────────┘
//!        ▼                      ▼                        ▼
//!   ┌──────────┐          ┌──────────┐             ┌──────────────┐
//!   │ Worker 0 │   ...    │ Worker N │             │ nested       │
//!   │ (loop)   │          │ (loop)   │             │ BaseService  │ ...
//!   └──────────┘          └──────────┘             └──────────────┘
//!
//!   publish(msg) ──► ServiceBus ──► [queue svc A] ──► reader A ──► listeners of A
//!                               └─► [queue svc B] ──► reader B ──► listeners of B
//! ```
//!
//! ### Lifecycle
//! ```text
//! start():
//!   ├─► spawn task workers and the bus reader
//!   ├─► resolve requirement providers (wave order, cycles rejected up front)
//!   ├─► start nested services in order
//!   │     └─ failure ─► stop started ones in reverse, stop tasks, return Err
//!   └─► running = true, spawn monitoring loop
//!
//! monitoring loop:
//!   healthcheck() ── Err (failed unit, dead reader, unhealthy child) ──► stop()
//!
//! stop():
//!   should_stop, running = false ─► nested (reverse) ─► bus reader ─► tasks
//! ```
//!
//! ## Features
//! | Area          | Description                                                  | Key types / traits                                |
//! |---------------|--------------------------------------------------------------|---------------------------------------------------|
//! | **Services**  | Lifecycle contract and the ready-made implementation.        | [`Service`], [`BaseService`], [`ServiceBuilder`]  |
//! | **Tasks**     | Periodic or one-shot bodies with worker pools.               | [`Task`], [`TaskFn`], [`TaskSpec`], [`TaskConfig`]|
//! | **Nesting**   | Dependency-ordered nested services with rollback.            | [`RequirementProvider`]                           |
//! | **Bus**       | Typed publish/subscribe with per-service dispatch.           | [`ServiceBus`], [`TypeKey`], [`Envelope`]         |
//! | **Errors**    | Typed errors for lifecycle, task bodies and declarations.    | [`ServiceError`], [`TaskError`], [`ConfigError`]  |
//! | **Config**    | Monitoring interval, exit detection, runtime, queue bounds.  | [`ServiceConfig`], [`BusConfig`]                  |
//!
//! ## Logging
//! Every component logs through [`tracing`] with a `service` field. The crate
//! never installs a subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use servicevisor::{BaseService, RequirementProvider, Service, ServiceRef, TaskConfig, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage: ServiceRef = Arc::new(BaseService::builder("storage").build());
//!
//!     let app = BaseService::builder("app")
//!         .task_fn("heartbeat", TaskConfig::every(Duration::from_millis(50)), |_ctx| async {
//!             Ok::<_, TaskError>(())
//!         })?
//!         .requirements(RequirementProvider::new("storage", [] as [&str; 0], move || {
//!             let storage = Arc::clone(&storage);
//!             async move { Ok(vec![storage]) }
//!         }))?
//!         .build();
//!
//!     app.start().await?;
//!     assert_eq!(app.nested_services().await, vec!["storage".to_string()]);
//!     app.stop().await?;
//!     Ok(())
//! }
//! ```

mod bus;
mod config;
mod core;
mod error;
mod nested;
mod tasks;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use bus::{BusQueue, Envelope, ServiceBus, TypeKey};
pub use config::{BusConfig, ExitDetection, ServiceConfig};
pub use core::{BaseService, Service, ServiceBuilder, ServiceRef, wait_for_shutdown_signal};
pub use error::{ConfigError, ServiceError, TaskError};
pub use nested::{ProvideFuture, RequirementProvider};
pub use tasks::{BoxTaskFuture, Task, TaskConfig, TaskFn, TaskRef, TaskSpec};

//! Service runtime core: contract, concrete service and lifecycle.
//!
//! The public API from this module is [`Service`], [`BaseService`] and
//! [`ServiceBuilder`].
//!
//! Internal modules:
//! - [`service`]: the lifecycle contract (`start`/`stop`/`healthcheck`);
//! - [`base`]: the concrete service composed of tasks, nested services and a bus reader;
//! - [`builder`]: static registration of tasks, providers and listeners;
//! - [`monitor`]: periodic self-healthcheck that escalates failures into a stop;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod base;
mod builder;
mod monitor;
mod service;
mod shutdown;


pub use base::BaseService;
pub use builder::ServiceBuilder;
pub use service::{Service, ServiceRef};
pub use shutdown::wait_for_shutdown_signal;

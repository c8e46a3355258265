//! # Service contract.
//!
//! [`Service`] is the lifecycle interface every supervised unit implements.
//! [`BaseService`](crate::BaseService) is the ready-made implementation;
//! custom services implement the trait themselves and usually delegate to an
//! inner `BaseService`.
//!
//! ## Contract
//! - `start()` either returns `Ok` with the service running, or returns an error
//!   after rolling back whatever it had started (the service is then not running).
//! - `stop()` is safe on a never-started or already-stopped service and marks
//!   the service as not running before any cleanup happens.
//! - `healthcheck()` fails with [`ServiceError::Unhealthy`] unless the service
//!   is running and every aggregated sub-check passes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// # Lifecycle-managed unit of work.
///
/// # Example
/// A wrapper binds itself as the owner of its inner [`BaseService`](crate::BaseService),
/// so the monitoring loop runs the wrapper's `healthcheck()` and escalates
/// through the wrapper's `stop()`.
/// ```
/// use std::sync::{Arc, Weak};
///
/// use async_trait::async_trait;
/// use servicevisor::{BaseService, Service, ServiceError};
///
/// struct Cache {
///     inner: BaseService,
/// }
///
/// impl Cache {
///     fn new() -> Arc<Self> {
///         Arc::new_cyclic(|me: &Weak<Cache>| {
///             let inner = BaseService::builder("cache").build();
///             inner.set_owner(me.clone());
///             Cache { inner }
///         })
///     }
/// }
///
/// #[async_trait]
/// impl Service for Cache {
///     fn name(&self) -> &str { self.inner.name() }
///
///     async fn start(&self) -> Result<(), ServiceError> {
///         // warm up...
///         self.inner.start().await
///     }
///
///     async fn stop(&self) -> Result<(), ServiceError> {
///         // flush...
///         self.inner.stop().await
///     }
///
///     async fn healthcheck(&self) -> Result<(), ServiceError> {
///         self.inner.healthcheck().await
///     }
///
///     fn is_running(&self) -> bool { self.inner.is_running() }
/// }
///
/// # let _ = Cache::new();
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Stable name used in logs; should include unique identifiers.
    fn name(&self) -> &str;

    /// Starts the service.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the service. Should not fail in normal operation.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Reports whether the service is running and healthy.
    async fn healthcheck(&self) -> Result<(), ServiceError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ServiceError::unhealthy(self.name(), "service is not running"))
        }
    }

    /// True between a successful `start()` and the beginning of `stop()`.
    fn is_running(&self) -> bool;
}

//! # Task abstraction.
//!
//! A [`Task`] is the body of a supervised unit: something that can be invoked
//! repeatedly, each invocation producing a fresh future. The common handle type
//! is [`TaskRef`], an `Arc<dyn Task>` shared by all workers of one task.
//!
//! Each invocation receives a [`CancellationToken`] that fires when the owning
//! service starts shutting down. Checking it is optional: a unit is also
//! cancelled at its next suspension point when the service stops.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by one task invocation.
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a task body.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use servicevisor::{BoxTaskFuture, Task};
///
/// struct Flush;
///
/// impl Task for Flush {
///     fn name(&self) -> &str { "flush" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Ok(());
///             }
///             // write buffers...
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates the future for one invocation of the body.
    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture;
}

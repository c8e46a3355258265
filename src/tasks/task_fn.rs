//! # Closure tasks.
//!
//! A periodic task body runs once per cycle, and a task with `workers > 1` runs
//! in several units at once. [`TaskFn`] therefore keeps the closure, not a
//! future: every cycle of every worker calls it again and awaits what it
//! returns. Whatever must survive between cycles, such as a counter or a
//! connection pool, lives behind an `Arc` captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use tokio_util::sync::CancellationToken;
//! use servicevisor::{TaskFn, TaskRef, TaskError};
//!
//! let polls = Arc::new(AtomicU64::new(0));
//! let t: TaskRef = TaskFn::arc("poll", move |_ctx: CancellationToken| {
//!     let polls = Arc::clone(&polls);
//!     async move {
//!         polls.fetch_add(1, Ordering::Relaxed);
//!         Ok::<_, TaskError>(())
//!     }
//! });
//!
//! assert_eq!(t.name(), "poll");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Task whose body is a closure returning a new future per cycle.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Wraps `f` under `name`; see [`TaskFn::arc`] for the shared form.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Wraps `f` as a [`TaskRef`](crate::TaskRef)-compatible handle, ready for
    /// [`TaskSpec::new`](crate::TaskSpec::new).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxTaskFuture {
        Box::pin((self.f)(ctx))
    }
}

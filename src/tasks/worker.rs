//! # Worker: one execution unit of a service task.
//!
//! A task declared with `workers = N` gets N independent [`Worker`]s.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► invoke body (panic caught → TaskError::Panicked)
//!   │     └─ Err ──► unit ends with that error (not retried)
//!   ├─► non-periodic            → exit Ok
//!   ├─► should_stop cancelled   → exit Ok
//!   └─► sleep(sleep_interval), cut short by should_stop → exit Ok
//! }
//! ```
//!
//! ## Rules
//! - `should_stop` is only consulted **between** invocations; an in-flight body
//!   is never interrupted by it. Stopping the service aborts the unit instead,
//!   which takes effect at the body's next `.await`. A body that never yields
//!   cannot be cancelled promptly.
//! - A failing unit optionally pings `exit_notify` so the monitoring loop can
//!   react before its next scheduled poll.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{select, sync::Notify, time};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TaskError;
use crate::tasks::{TaskConfig, TaskRef};

/// One supervised execution unit.
pub(crate) struct Worker {
    /// Body shared with sibling workers.
    pub task: TaskRef,
    /// Execution parameters.
    pub config: TaskConfig,
    /// Deterministic unit name (`service.task.index`).
    pub unit: Arc<str>,
    /// Woken when the unit fails (immediate exit detection only).
    pub exit_notify: Option<Arc<Notify>>,
}

impl Worker {
    /// Runs the unit until its body fails, it completes a one-shot run, or
    /// `should_stop` fires between invocations.
    pub async fn run(self, should_stop: CancellationToken) -> Result<(), TaskError> {
        debug!(unit = %self.unit, "task unit started");
        let res = self.run_loop(&should_stop).await;

        match &res {
            Ok(()) | Err(TaskError::Canceled) => {
                debug!(unit = %self.unit, "task unit finished");
            }
            Err(e) => {
                debug!(unit = %self.unit, error = %e, label = e.as_label(), "task unit failed");
                if let Some(notify) = &self.exit_notify {
                    notify.notify_one();
                }
            }
        }
        res
    }

    async fn run_loop(&self, should_stop: &CancellationToken) -> Result<(), TaskError> {
        loop {
            invoke(&self.task, should_stop).await?;

            if !self.config.periodic() || should_stop.is_cancelled() {
                return Ok(());
            }

            let sleep = time::sleep(self.config.sleep_interval());
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = should_stop.cancelled() => return Ok(()),
            }
        }
    }
}

/// Executes one invocation of `task`, converting a panic into [`TaskError::Panicked`].
async fn invoke(task: &TaskRef, should_stop: &CancellationToken) -> Result<(), TaskError> {
    let fut = task.spawn(should_stop.child_token());
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(TaskError::from_panic(panic)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::tasks::TaskFn;

    fn counting(calls: &Arc<AtomicUsize>, fail_at: Option<usize>) -> TaskRef {
        let calls = Arc::clone(calls);
        TaskFn::arc("count", move |_ctx: CancellationToken| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if Some(n) == fail_at {
                    return Err(TaskError::fail("boom"));
                }
                Ok(())
            }
        })
    }

    fn worker(task: TaskRef, config: TaskConfig, notify: Option<Arc<Notify>>) -> Worker {
        Worker {
            task,
            config,
            unit: Arc::from("svc.count.0"),
            exit_notify: notify,
        }
    }

    #[tokio::test]
    async fn one_shot_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let w = worker(counting(&calls, None), TaskConfig::one_shot(), None);

        w.run(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn periodic_stops_between_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cfg = TaskConfig::every(Duration::from_millis(5));
        let w = worker(counting(&calls, None), cfg, None);
        let token = CancellationToken::new();

        let handle = tokio::spawn(w.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(40)).await;
        token.cancel();

        handle.await.unwrap().unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn body_error_ends_the_unit_and_notifies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(Notify::new());
        let cfg = TaskConfig::every(Duration::ZERO);
        let w = worker(counting(&calls, Some(3)), cfg, Some(Arc::clone(&notify)));

        let err = w.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, TaskError::fail("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // notify_one stores a permit when nobody is waiting
        tokio::time::timeout(Duration::from_millis(100), notify.notified())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn panic_becomes_a_task_error() {
        let task: TaskRef = TaskFn::arc("panics", |ctx: CancellationToken| async move {
            if !ctx.is_cancelled() {
                panic!("exploded");
            }
            Ok(())
        });
        let w = worker(task, TaskConfig::one_shot(), None);

        let err = w.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, TaskError::Panicked { info: "exploded".into() });
    }
}

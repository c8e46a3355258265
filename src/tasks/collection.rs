//! # Task collection - handles of live execution units.
//!
//! Tracks every unit a service spawned (task workers and the bus reader)
//! and converts their outcomes into health signals.
//!
//! ## Architecture
//! ```text
//! BaseService::start ──► spawn(unit) ──► Vec<UnitHandle>
//!
//! healthcheck ──► check_all()
//!                   ├─ unfinished units   → kept
//!                   └─ finished units     → joined and dropped
//!                        ├─ Ok / Canceled / aborted → debug log
//!                        └─ Err / panic             → UnexpectedTask (first one returned)
//!
//! stop ──► stop_all() ──► abort every unit ──► join all ──► failures logged, never returned
//! ```
//!
//! ## Rules
//! - A finished unit is removed on the first `check_all` that sees it, so each
//!   failure is reported exactly once.
//! - Cancellation (abort or `TaskError::Canceled`) is never a failure.

use std::{future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, TaskError};

/// Handle to a spawned unit.
struct UnitHandle {
    /// Deterministic unit name.
    name: Arc<str>,
    /// Join handle of the unit.
    join: JoinHandle<Result<(), TaskError>>,
}

/// Units owned by one service.
#[derive(Default)]
pub(crate) struct TaskCollection {
    units: Vec<UnitHandle>,
}

impl TaskCollection {
    /// Spawns `fut` as a unit named `name` on the runtime selected by `cfg`.
    pub fn spawn<F>(&mut self, cfg: &ServiceConfig, name: Arc<str>, fut: F)
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let join = cfg.spawn(fut);
        self.units.push(UnitHandle { name, join });
    }

    /// Number of tracked units (finished units stay tracked until the next check).
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Number of units that have not finished yet.
    pub fn live(&self) -> usize {
        self.units.iter().filter(|u| !u.join.is_finished()).count()
    }

    /// Names of tracked units, in spawn order.
    pub fn names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name.to_string()).collect()
    }

    /// Prunes finished units and reports the first unexpected failure among them.
    pub async fn check_all(&mut self) -> Result<(), ServiceError> {
        let (finished, live): (Vec<_>, Vec<_>) =
            self.units.drain(..).partition(|u| u.join.is_finished());
        self.units = live;

        let mut failure = None;
        for unit in finished {
            let name = Arc::clone(&unit.name);
            if let Err(e) = settle(unit).await {
                if failure.is_none() {
                    failure = Some(ServiceError::UnexpectedTask {
                        unit: name.to_string(),
                        source: e,
                    });
                } else {
                    warn!(
                        unit = %name,
                        error = %e,
                        label = e.as_label(),
                        "another task unit failed"
                    );
                }
            } else {
                debug!(unit = %name, "removed finished task unit");
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Aborts every unit and waits for all of them to settle.
    ///
    /// Failures are logged, never returned: stopping always completes.
    pub async fn stop_all(&mut self) {
        let units: Vec<UnitHandle> = self.units.drain(..).collect();
        for unit in &units {
            unit.join.abort();
        }

        let count = units.len();
        for unit in units {
            let name = Arc::clone(&unit.name);
            if let Err(e) = settle(unit).await {
                error!(
                    unit = %name,
                    error = %e,
                    label = e.as_label(),
                    "task unit stopped with error"
                );
            }
        }
        debug!(count, "cancelled task units");
    }
}

/// Joins a unit, mapping cancellation to `Ok`.
async fn settle(unit: UnitHandle) -> Result<(), TaskError> {
    match unit.join.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(TaskError::Canceled)) => {
            debug!(unit = %unit.name, "task unit was cancelled");
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(je) if je.is_cancelled() => {
            debug!(unit = %unit.name, "task unit was aborted");
            Ok(())
        }
        Err(je) => match je.try_into_panic() {
            Ok(panic) => Err(TaskError::from_panic(panic)),
            Err(je) => Err(TaskError::fail(je.to_string())),
        },
    }
}

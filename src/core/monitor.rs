//! # Monitoring loop.
//!
//! One per running [`BaseService`](crate::BaseService), spawned at the end of a
//! successful start.
//!
//! ```text
//! while !should_stop {
//!   healthcheck()
//!     └─ Err → log, break
//!   wait for the first of:
//!     ├─ monitoring_interval elapsed
//!     ├─ should_stop cancelled
//!     └─ a unit failed (ExitDetection::Immediate only)
//! }
//! if !should_stop → stop()     (escalation: failure becomes a full shutdown)
//! ```
//!
//! `healthcheck()` and `stop()` go through the owner bound with
//! [`BaseService::set_owner`](crate::BaseService::set_owner) when there is one.
//! The loop is never aborted by `stop()`: it may itself be the caller.

use std::sync::Arc;

use tokio::{select, time};
use tracing::{debug, error};

use crate::config::ExitDetection;
use crate::error::ServiceError;

use super::base::ServiceCore;
use super::service::Service;

async fn healthcheck(core: &ServiceCore) -> Result<(), ServiceError> {
    match core.owner() {
        Some(owner) => owner.healthcheck().await,
        None => core.healthcheck().await,
    }
}

async fn stop(core: &ServiceCore) -> Result<(), ServiceError> {
    match core.owner() {
        Some(owner) => owner.stop().await,
        None => core.stop().await,
    }
}

pub(crate) async fn run(core: Arc<ServiceCore>) {
    let immediate = core.config().exit_detection == ExitDetection::Immediate;
    let should_stop = core.should_stop_token();
    debug!(service = core.name(), "monitoring loop started");

    while !should_stop.is_cancelled() {
        if let Err(e) = healthcheck(&core).await {
            if e.is_unhealthy() {
                error!(
                    service = core.name(),
                    error = %e,
                    label = e.as_label(),
                    "healthcheck failed"
                );
            } else {
                error!(
                    service = core.name(),
                    error = %e,
                    label = e.as_label(),
                    "healthcheck failed with unexpected error"
                );
            }
            break;
        }

        select! {
            biased;
            _ = should_stop.cancelled() => break,
            _ = core.exit_notify().notified(), if immediate => {
                debug!(service = core.name(), "task unit exit observed");
                // let the failed unit finish before it is joined
                tokio::task::yield_now().await;
            }
            _ = time::sleep(core.config().monitoring_interval) => {}
        }
    }

    if !should_stop.is_cancelled() {
        if let Err(e) = stop(&core).await {
            error!(
                service = core.name(),
                error = %e,
                label = e.as_label(),
                "failed to stop unhealthy service"
            );
        }
    }
    debug!(service = core.name(), "monitoring loop stopped");
}

//! # Bus reader: drains one service's queue.
//!
//! ```text
//! loop {
//!   ├─ should_stop cancelled  → exit Ok
//!   ├─ queue.recv() = Some    → ListenerTable::dispatch (failures logged there)
//!   └─ queue.recv() = None    → exit Err (queue closed under a running service)
//! }
//! ```
//!
//! The reader runs as a unit of the owning service, so an unexpected exit is
//! reported by the service's healthcheck and an abort during shutdown is silent.

use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TaskError;

use super::listeners::ListenerTable;
use super::queue::BusQueue;

/// Reader loop state for one service.
pub(crate) struct BusReader {
    pub service: Arc<str>,
    pub queue: BusQueue,
    pub listeners: Arc<ListenerTable>,
}

impl BusReader {
    pub async fn run(mut self, should_stop: CancellationToken) -> Result<(), TaskError> {
        debug!(service = %self.service, "bus reader started");
        loop {
            select! {
                biased;
                _ = should_stop.cancelled() => break,
                msg = self.queue.recv() => match msg {
                    Some(env) => {
                        self.listeners.dispatch(&self.service, env).await;
                    }
                    None => return Err(TaskError::fail("bus queue closed")),
                },
            }
        }
        debug!(service = %self.service, "bus reader stopped");
        Ok(())
    }
}

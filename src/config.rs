//! # Construction-time configuration.
//!
//! Provides [`ServiceConfig`] (per-service runtime settings) and [`BusConfig`]
//! (per-bus queue settings).
//!
//! ## Sentinel values
//! - `runtime = None` → units are spawned on the ambient tokio runtime
//! - `queue_capacity = None` → unbounded subscriber queues

use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle};

/// How quickly the supervisor learns that a task unit has finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitDetection {
    /// Finished units are discovered by the next periodic healthcheck, so a
    /// failure may go unnoticed for up to one `monitoring_interval` (default).
    #[default]
    Poll,
    /// A unit that fails wakes the monitoring loop right away.
    Immediate,
}

/// Per-service configuration.
///
/// ## Field semantics
/// - `monitoring_interval`: pause between self-healthchecks of the monitoring loop
/// - `exit_detection`: see [`ExitDetection`]
/// - `runtime`: injected runtime handle used for every unit the service spawns
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Poll period of the monitoring loop.
    pub monitoring_interval: Duration,

    /// Latency trade-off for noticing finished task units.
    pub exit_detection: ExitDetection,

    /// Runtime that units are spawned on (`None` = `tokio::spawn`).
    pub runtime: Option<Handle>,
}

impl ServiceConfig {
    /// Returns a config with the given monitoring interval.
    #[must_use]
    pub fn with_monitoring_interval(mut self, interval: Duration) -> Self {
        self.monitoring_interval = interval;
        self
    }

    /// Returns a config with the given exit detection mode.
    #[must_use]
    pub fn with_exit_detection(mut self, mode: ExitDetection) -> Self {
        self.exit_detection = mode;
        self
    }

    /// Returns a config that spawns on `handle`.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Spawns `fut` on the injected runtime, or on the ambient one.
    pub(crate) fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.runtime {
            Some(handle) => handle.spawn(fut),
            None => tokio::spawn(fut),
        }
    }
}

impl Default for ServiceConfig {
    /// Default configuration:
    ///
    /// - `monitoring_interval = 100ms`
    /// - `exit_detection = ExitDetection::Poll`
    /// - `runtime = None`
    fn default() -> Self {
        Self {
            monitoring_interval: Duration::from_millis(100),
            exit_detection: ExitDetection::Poll,
            runtime: None,
        }
    }
}

/// Configuration of a [`ServiceBus`](crate::ServiceBus).
#[derive(Clone, Copy, Debug, Default)]
pub struct BusConfig {
    /// Capacity of each subscriber queue.
    ///
    /// - `None` = unbounded, no backpressure (default)
    /// - `Some(n)` = at most `n` pending messages; when full the message is
    ///   dropped for that subscriber only. Values below 1 are clamped to 1.
    pub queue_capacity: Option<usize>,
}

impl BusConfig {
    /// Bounded-queue configuration.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            queue_capacity: Some(capacity.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.monitoring_interval, Duration::from_millis(100));
        assert_eq!(cfg.exit_detection, ExitDetection::Poll);
        assert!(cfg.runtime.is_none());
        assert!(BusConfig::default().queue_capacity.is_none());
    }

    #[test]
    fn bounded_capacity_is_clamped() {
        assert_eq!(BusConfig::bounded(0).queue_capacity, Some(1));
        assert_eq!(BusConfig::bounded(8).queue_capacity, Some(8));
    }
}

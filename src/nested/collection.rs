//! # ServiceCollection: ordered nested services with a started prefix.
//!
//! ```text
//! services: [s0, s1, s2, s3]
//! started:   ^^^^^^ (prefix length 2)
//!
//! start_all: s2.start + s2.healthcheck
//!              └─ Err → Startup(s2) → stop s2 if its start succeeded, then s1, s0
//! stop_all:  stop prefix in reverse (s1, s0); failures logged, never returned
//! ```
//!
//! The started prefix bounds rollback exactly to what actually started.

use std::sync::Arc;

use tracing::{debug, error};

use crate::core::ServiceRef;
use crate::error::ServiceError;

/// Nested services owned by one parent.
#[derive(Default)]
pub(crate) struct ServiceCollection {
    services: Vec<ServiceRef>,
    started: usize,
}

impl ServiceCollection {
    pub fn new(services: Vec<ServiceRef>) -> Self {
        Self { services, started: 0 }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Names of the started services, in start order.
    pub fn started_names(&self) -> Vec<String> {
        self.services[..self.started]
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Starts every service in order, rolling back on the first failure.
    pub async fn start_all(&mut self, parent: &str) -> Result<(), ServiceError> {
        while self.started < self.services.len() {
            let svc = Arc::clone(&self.services[self.started]);

            if let Err(e) = svc.start().await {
                error!(
                    service = parent,
                    nested = svc.name(),
                    error = %e,
                    label = e.as_label(),
                    "exception while starting nested service"
                );
                let err = startup(&svc, e);
                self.stop_all(parent).await;
                return Err(err);
            }
            if let Err(e) = svc.healthcheck().await {
                error!(
                    service = parent,
                    nested = svc.name(),
                    error = %e,
                    label = e.as_label(),
                    "nested service unhealthy after start"
                );
                let err = startup(&svc, e);
                // started but unhealthy: stopped first, then the prefix
                stop_one(parent, &svc).await;
                self.stop_all(parent).await;
                return Err(err);
            }

            debug!(service = parent, nested = svc.name(), "nested service started");
            self.started += 1;
        }
        Ok(())
    }

    /// Stops the started prefix in reverse order.
    pub async fn stop_all(&mut self, parent: &str) {
        if self.started == 0 {
            debug!(service = parent, "there are no nested services to stop");
            return;
        }
        debug!(service = parent, count = self.started, "stopping nested services");
        for svc in self.services[..self.started].iter().rev() {
            stop_one(parent, svc).await;
        }
        self.started = 0;
        debug!(service = parent, "all nested services were stopped");
    }

    /// Checks every started service; the first failure wins.
    pub async fn healthcheck(&self) -> Result<(), ServiceError> {
        for svc in &self.services[..self.started] {
            svc.healthcheck().await?;
        }
        Ok(())
    }
}

fn startup(svc: &ServiceRef, source: ServiceError) -> ServiceError {
    ServiceError::Startup {
        service: svc.name().to_string(),
        source: Box::new(source),
    }
}

async fn stop_one(parent: &str, svc: &ServiceRef) {
    if let Err(e) = svc.stop().await {
        error!(
            service = parent,
            nested = svc.name(),
            error = %e,
            label = e.as_label(),
            "fail to stop nested service"
        );
    }
}

//! Scripted services shared by scenario tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;

use crate::{Service, ServiceError};

/// Ordered record of lifecycle calls across several probes.
pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Leaf service whose lifecycle calls can be scripted to fail.
pub(crate) struct Probe {
    name: String,
    running: AtomicBool,
    fail_start: bool,
    fail_health: bool,
    fail_stop: bool,
    journal: Journal,
}

impl Probe {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            running: AtomicBool::new(false),
            fail_start: false,
            fail_health: false,
            fail_stop: false,
            journal: Arc::clone(journal),
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record(&self, what: &str) {
        self.journal.lock().unwrap().push(format!("{what}:{}", self.name));
    }
}

#[async_trait]
impl Service for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), ServiceError> {
        if self.fail_start {
            self.record("start-failed");
            return Err(ServiceError::failed(&self.name, "EXPECTED start failure"));
        }
        self.running.store(true, Ordering::SeqCst);
        self.record("start");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.running.store(false, Ordering::SeqCst);
        self.record("stop");
        if self.fail_stop {
            return Err(ServiceError::failed(&self.name, "EXPECTED stop failure"));
        }
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), ServiceError> {
        if !self.is_running() {
            return Err(ServiceError::unhealthy(&self.name, "not running"));
        }
        if self.fail_health {
            return Err(ServiceError::unhealthy(&self.name, "EXPECTED broken healthcheck"));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

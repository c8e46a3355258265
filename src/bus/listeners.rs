//! # Listener registration and dispatch.
//!
//! A [`ListenerTable`] belongs to one service and maps each message type to
//! the listeners declared for it, in registration order. It is built once
//! while the service is assembled and never changes afterwards.
//!
//! ## Dispatch rules
//! - every listener registered for the message type runs, in order
//! - an error or panic in one listener is logged and does not stop the others
//!
//! **Warning**: panics are caught with `AssertUnwindSafe`; shared state a
//! listener held a lock on while panicking may be left inconsistent.

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};

use futures::FutureExt;
use tracing::{debug, error};

use crate::error::{ConfigError, TaskError};
use crate::tasks::BoxTaskFuture;

use super::message::{Envelope, TypeKey};

type ListenerFn = Arc<dyn Fn(Envelope) -> BoxTaskFuture + Send + Sync>;

#[derive(Clone)]
struct Listener {
    name: Arc<str>,
    call: ListenerFn,
}

/// Per-service mapping from message type to listeners.
#[derive(Clone, Default)]
pub(crate) struct ListenerTable {
    by_key: HashMap<TypeKey, Vec<Listener>>,
    keys: Vec<TypeKey>,
}

impl ListenerTable {
    /// Registers a typed listener for messages of type `M`.
    pub fn add<M, F, Fut>(&mut self, name: &str, f: F)
    where
        M: Any + Send + Sync,
        F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let call: ListenerFn = Arc::new(move |env: Envelope| -> BoxTaskFuture {
            match env.downcast::<M>() {
                Some(msg) => Box::pin(f(msg)),
                None => {
                    let key = env.key();
                    Box::pin(async move {
                        Err::<(), _>(TaskError::fail(format!("unexpected message type {key}")))
                    })
                }
            }
        });
        self.insert(name, TypeKey::of::<M>(), call);
    }

    /// Registers one untyped listener for several message types.
    pub fn add_for<F, Fut>(&mut self, name: &str, keys: &[TypeKey], f: F) -> Result<(), ConfigError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        if keys.is_empty() {
            return Err(ConfigError::EmptyListenerTypes {
                name: name.to_string(),
            });
        }
        let call: ListenerFn = Arc::new(move |env: Envelope| -> BoxTaskFuture { Box::pin(f(env)) });
        for key in keys {
            self.insert(name, *key, Arc::clone(&call));
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, key: TypeKey, call: ListenerFn) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self.by_key.entry(key).or_default().push(Listener {
            name: Arc::from(name),
            call,
        });
    }

    /// Message types with at least one listener, in first-registration order.
    pub fn keys(&self) -> &[TypeKey] {
        &self.keys
    }

    /// True if no listener was registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Runs every listener registered for the message type; returns how many failed.
    pub async fn dispatch(&self, service: &str, env: Envelope) -> usize {
        let Some(listeners) = self.by_key.get(&env.key()) else {
            debug!(service, message = %env.key(), "no listener for bus message");
            return 0;
        };
        debug!(
            service,
            message = %env.key(),
            listeners = listeners.len(),
            "dispatching bus message"
        );

        let mut failures = 0;
        for listener in listeners {
            let call = Arc::clone(&listener.call);
            let msg = env.clone();
            let res = AssertUnwindSafe(async move { call(msg).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(TaskError::from_panic(panic)));

            if let Err(e) = res {
                failures += 1;
                error!(
                    service,
                    listener = %listener.name,
                    message = %env.key(),
                    error = %e,
                    label = e.as_label(),
                    "exception while processing bus message"
                );
            }
        }
        failures
    }
}

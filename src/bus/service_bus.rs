//! # ServiceBus: typed in-process publish/subscribe.
//!
//! Maps a message [`TypeKey`] to the queues of the services subscribed to it.
//!
//! ## Architecture
//! ```text
//! publish(msg) ──► TypeKey::of::<M>() ──► subscriptions[key]
//!                                           ├──► [queue svc A] ──► reader A ──► listeners of A
//!                                           ├──► [queue svc B] ──► reader B ──► listeners of B
//!                                           └──► [queue svc N] ──► reader N ──► listeners of N
//! ```
//!
//! ## Rules
//! - **Per-queue FIFO**; no ordering across subscribers.
//! - **Non-blocking publish**: enqueueing never waits, even on bounded queues.
//! - **One queue per (type, service)**: duplicate keys in a subscribe call are ignored.
//! - Subscriptions are written when services are built.
//! - Queues of stopped services are skipped, then pruned by the same publish.

use std::{
    any::Any,
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, warn};

use crate::config::BusConfig;

use super::message::{Envelope, TypeKey};
use super::queue::{self, BusQueue, Delivery, QueueSender};

struct Subscription {
    subscriber: Arc<str>,
    queue: QueueSender,
}

#[derive(Default)]
struct BusInner {
    config: BusConfig,
    subscriptions: RwLock<HashMap<TypeKey, Vec<Subscription>>>,
}

/// Shared, cloneable bus handle.
///
/// ## Example
/// ```rust
/// use servicevisor::{ServiceBus, TypeKey};
///
/// struct Tick;
///
/// let bus = ServiceBus::new();
/// let mut queue = bus.subscribe("clock", &[TypeKey::of::<Tick>()]);
///
/// assert_eq!(bus.publish(Tick), 1);
/// assert!(queue.try_recv().is_some_and(|env| env.is::<Tick>()));
/// ```
#[derive(Clone, Default)]
pub struct ServiceBus {
    inner: Arc<BusInner>,
}

impl ServiceBus {
    /// Creates a bus with unbounded subscriber queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with the given queue configuration.
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                subscriptions: RwLock::default(),
            }),
        }
    }

    /// Creates one queue for `subscriber` and registers it under every key.
    pub fn subscribe(&self, subscriber: &str, keys: &[TypeKey]) -> BusQueue {
        let (tx, rx) = queue::channel(subscriber, self.inner.config.queue_capacity);
        let name: Arc<str> = Arc::from(subscriber);

        let mut subs = self
            .inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if !seen.insert(*key) {
                continue;
            }
            debug!(service = %name, message = %key, "subscribed to bus messages");
            subs.entry(*key).or_default().push(Subscription {
                subscriber: Arc::clone(&name),
                queue: tx.clone(),
            });
        }
        rx
    }

    /// Enqueues `msg` to every queue subscribed to its type.
    ///
    /// Returns the number of queues that accepted the message.
    pub fn publish<M: Any + Send + Sync>(&self, msg: M) -> usize {
        self.publish_envelope(Envelope::new(msg))
    }

    /// Enqueues an already wrapped message.
    pub fn publish_envelope(&self, env: Envelope) -> usize {
        let key = env.key();
        let (delivered, closed) = {
            let subs = self
                .inner
                .subscriptions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(targets) = subs.get(&key) else {
                debug!(message = %key, "no subscribers for bus message");
                return 0;
            };

            let mut delivered = 0;
            let mut closed = false;
            for target in targets {
                match target.queue.deliver(env.clone()) {
                    Delivery::Enqueued => delivered += 1,
                    Delivery::Full => {
                        warn!(
                            service = %target.subscriber,
                            message = %key,
                            "subscriber queue full, bus message dropped"
                        );
                    }
                    Delivery::Closed => {
                        debug!(
                            service = %target.subscriber,
                            message = %key,
                            "subscriber queue closed, bus message skipped"
                        );
                        closed = true;
                    }
                }
            }
            (delivered, closed)
        };

        if closed {
            self.prune(key);
        }
        delivered
    }

    /// Drops the subscriptions under `key` whose queue is closed.
    fn prune(&self, key: TypeKey) {
        let mut subs = self
            .inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(targets) = subs.get_mut(&key) {
            targets.retain(|t| !t.queue.is_closed());
            if targets.is_empty() {
                subs.remove(&key);
            }
        }
    }

    /// Names of services subscribed to `key`, in subscription order.
    pub fn subscribers(&self, key: TypeKey) -> Vec<String> {
        self.inner
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|targets| targets.iter().map(|t| t.subscriber.to_string()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Order(u32);
    struct Refund;

    #[test]
    fn fans_out_to_every_subscriber_in_fifo_order() {
        let bus = ServiceBus::new();
        let mut billing = bus.subscribe("billing", &[TypeKey::of::<Order>()]);
        let audit = bus.subscribe("audit", &[TypeKey::of::<Order>(), TypeKey::of::<Refund>()]);

        assert_eq!(bus.publish(Order(1)), 2);
        assert_eq!(bus.publish(Order(2)), 2);
        assert_eq!(bus.publish(Refund), 1);

        let got: Vec<u32> = std::iter::from_fn(|| billing.try_recv())
            .filter_map(|env| env.downcast::<Order>().map(|o| o.0))
            .collect();
        assert_eq!(got, vec![1, 2]);
        assert_eq!(audit.len(), 3);
    }

    #[test]
    fn duplicate_keys_register_one_queue() {
        let bus = ServiceBus::new();
        let key = TypeKey::of::<Order>();
        let queue = bus.subscribe("billing", &[key, key]);

        assert_eq!(bus.publish(Order(1)), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(bus.subscribers(key), vec!["billing".to_string()]);
    }

    #[test]
    fn unsubscribed_types_are_not_delivered() {
        let bus = ServiceBus::new();
        let _queue = bus.subscribe("billing", &[TypeKey::of::<Order>()]);
        assert_eq!(bus.publish(Refund), 0);
    }

    #[test]
    fn bounded_queue_drops_only_for_the_full_subscriber() {
        let bus = ServiceBus::with_config(BusConfig::bounded(1));
        let slow = bus.subscribe("slow", &[TypeKey::of::<Order>()]);
        let mut fast = bus.subscribe("fast", &[TypeKey::of::<Order>()]);

        assert_eq!(bus.publish(Order(1)), 2);
        assert!(fast.try_recv().is_some());
        assert_eq!(bus.publish(Order(2)), 1);
        assert_eq!(slow.len(), 1);
    }

    #[test]
    fn closed_queues_are_skipped_and_pruned() {
        let bus = ServiceBus::new();
        let key = TypeKey::of::<Order>();
        let gone = bus.subscribe("gone", &[key]);
        let _kept = bus.subscribe("kept", &[key]);
        drop(gone);

        assert_eq!(bus.subscribers(key), ["gone", "kept"]);
        assert_eq!(bus.publish(Order(1)), 1);
        assert_eq!(bus.subscribers(key), ["kept"]);
    }

    #[test]
    fn last_closed_queue_removes_the_type() {
        let bus = ServiceBus::new();
        let key = TypeKey::of::<Order>();
        drop(bus.subscribe("gone", &[key]));

        assert_eq!(bus.publish(Order(1)), 0);
        assert!(bus.subscribers(key).is_empty());
        assert_eq!(bus.publish(Order(2)), 0);
    }
}

//! # Per-service delivery queues.
//!
//! One queue per subscribing service. Unbounded by default; with
//! [`BusConfig::queue_capacity`](crate::BusConfig) set, a full queue drops
//! the message for that subscriber only. Enqueueing never waits.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::message::Envelope;

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Enqueued,
    Full,
    Closed,
}

/// Sending half kept in the bus subscription map.
#[derive(Clone)]
pub(crate) enum QueueSender {
    Bounded(mpsc::Sender<Envelope>),
    Unbounded(mpsc::UnboundedSender<Envelope>),
}

impl QueueSender {
    /// Enqueues without waiting.
    pub fn deliver(&self, env: Envelope) -> Delivery {
        match self {
            QueueSender::Bounded(tx) => match tx.try_send(env) {
                Ok(()) => Delivery::Enqueued,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            },
            QueueSender::Unbounded(tx) => match tx.send(env) {
                Ok(()) => Delivery::Enqueued,
                Err(_) => Delivery::Closed,
            },
        }
    }

    /// True once the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        match self {
            QueueSender::Bounded(tx) => tx.is_closed(),
            QueueSender::Unbounded(tx) => tx.is_closed(),
        }
    }
}

enum QueueReceiver {
    Bounded(mpsc::Receiver<Envelope>),
    Unbounded(mpsc::UnboundedReceiver<Envelope>),
}

/// Receiving half handed to the subscriber.
pub struct BusQueue {
    subscriber: Arc<str>,
    rx: QueueReceiver,
}

impl BusQueue {
    /// Name of the subscribing service.
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Waits for the next message; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        match &mut self.rx {
            QueueReceiver::Bounded(rx) => rx.recv().await,
            QueueReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Takes a message if one is ready.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        match &mut self.rx {
            QueueReceiver::Bounded(rx) => rx.try_recv().ok(),
            QueueReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Number of messages waiting.
    pub fn len(&self) -> usize {
        match &self.rx {
            QueueReceiver::Bounded(rx) => rx.len(),
            QueueReceiver::Unbounded(rx) => rx.len(),
        }
    }

    /// True if no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates a queue for `subscriber`; `capacity = None` means unbounded.
pub(crate) fn channel(subscriber: &str, capacity: Option<usize>) -> (QueueSender, BusQueue) {
    let (tx, rx) = match capacity {
        Some(cap) => {
            let (tx, rx) = mpsc::channel(cap.max(1));
            (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
        }
    };
    let queue = BusQueue {
        subscriber: Arc::from(subscriber),
        rx,
    };
    (tx, queue)
}

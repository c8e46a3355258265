//! Typed in-process event bus.
//!
//! ## Contents
//! - [`TypeKey`], [`Envelope`] message identity and shared payload
//! - [`ServiceBus`] process-wide (or explicitly shared) subscription map
//! - [`BusQueue`] per-service delivery queue
//! - `ListenerTable` per-service listeners, `BusReader` per-service drain loop
//!
//! ## Quick reference
//! - **Publishers**: anyone holding a `ServiceBus` clone (including listeners).
//! - **Consumers**: one `BusReader` unit per subscribed service, started with
//!   the service and dispatching to its listeners.

mod listeners;
mod message;
mod queue;
mod reader;
mod service_bus;

pub(crate) use listeners::ListenerTable;
pub(crate) use reader::BusReader;

pub use message::{Envelope, TypeKey};
pub use queue::BusQueue;
pub use service_bus::ServiceBus;

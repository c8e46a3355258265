//! # Service tasks.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for async cancelable task bodies
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskConfig`] - validated execution parameters (periodic, interval, workers)
//! - [`TaskSpec`] - a task bound to its parameters
//!
//! Internally, [`worker`] runs one execution unit and [`collection`] tracks
//! the handles of all units owned by a service.

mod collection;
mod spec;
mod task;
mod task_fn;
mod worker;

pub(crate) use collection::TaskCollection;
pub(crate) use worker::Worker;

pub use spec::{TaskConfig, TaskSpec};
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;

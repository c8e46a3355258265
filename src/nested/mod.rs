//! Nested services.
//!
//! - [`RequirementProvider`] declares where nested services come from
//! - `resolver` orders providers by their prerequisites and runs them
//! - `ServiceCollection` starts the result with rollback and stops it in reverse

mod collection;
mod provider;
mod resolver;

pub(crate) use collection::ServiceCollection;
pub(crate) use resolver::resolve;

pub use provider::{ProvideFuture, RequirementProvider};

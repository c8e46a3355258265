//! # Requirement providers.
//!
//! A [`RequirementProvider`] is a named step declared on a service. Once every
//! provider it names as a prerequisite has run, it runs exactly once and yields
//! the nested services to add to the owner's collection.

use std::{collections::BTreeSet, future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::core::ServiceRef;
use crate::error::TaskError;

/// Future returned by one provider invocation.
pub type ProvideFuture = BoxFuture<'static, Result<Vec<ServiceRef>, TaskError>>;

type ProvideFn = Arc<dyn Fn() -> ProvideFuture + Send + Sync>;

/// Named source of nested services.
///
/// ## Example
/// ```rust
/// use servicevisor::{RequirementProvider, ServiceRef};
///
/// let storage = RequirementProvider::new("storage", [] as [&str; 0], || async {
///     Ok(Vec::<ServiceRef>::new())
/// });
/// let api = RequirementProvider::new("api", ["storage"], || async { Ok(Vec::new()) });
///
/// assert!(storage.prerequisites().is_empty());
/// assert!(api.prerequisites().contains("storage"));
/// ```
#[derive(Clone)]
pub struct RequirementProvider {
    name: Arc<str>,
    prerequisites: BTreeSet<String>,
    provide: ProvideFn,
}

impl RequirementProvider {
    /// Creates a provider named `name` that runs after all `prerequisites`.
    pub fn new<I, S, F, Fut>(name: &str, prerequisites: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ServiceRef>, TaskError>> + Send + 'static,
    {
        Self {
            name: Arc::from(name),
            prerequisites: prerequisites.into_iter().map(Into::into).collect(),
            provide: Arc::new(move || -> ProvideFuture { Box::pin(f()) }),
        }
    }

    /// Provider name, unique within one service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of providers that must run first.
    pub fn prerequisites(&self) -> &BTreeSet<String> {
        &self.prerequisites
    }

    pub(crate) fn provide(&self) -> ProvideFuture {
        (self.provide)()
    }
}

impl std::fmt::Debug for RequirementProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementProvider")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

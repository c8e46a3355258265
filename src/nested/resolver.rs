//! # Wave-based requirement resolution.
//!
//! ```text
//! plan():    pending = all providers, satisfied = ∅
//!            pass over pending in declaration order:
//!              prerequisites ⊆ satisfied → scheduled, satisfied += name
//!            a pass that schedules nothing → DependencyCycle
//!
//! resolve(): plan() ──► run providers in planned order ──► Vec<ServiceRef>
//! ```
//!
//! Planning needs only names, so a dangling or cyclic graph is rejected before
//! any provider runs and before any nested service starts.

use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::core::ServiceRef;
use crate::error::ServiceError;

use super::provider::RequirementProvider;

/// Computes the execution order of `providers` (indices into the slice).
pub(crate) fn plan(
    service: &str,
    providers: &[RequirementProvider],
) -> Result<Vec<usize>, ServiceError> {
    let declared: HashSet<&str> = providers.iter().map(RequirementProvider::name).collect();
    for p in providers {
        if let Some(missing) = p.prerequisites().iter().find(|r| !declared.contains(r.as_str())) {
            return Err(ServiceError::MissingRequirement {
                service: service.to_string(),
                provider: p.name().to_string(),
                missing: missing.clone(),
            });
        }
    }

    let mut pending: Vec<usize> = (0..providers.len()).collect();
    let mut satisfied: HashSet<&str> = HashSet::with_capacity(providers.len());
    let mut order = Vec::with_capacity(providers.len());

    while !pending.is_empty() {
        let before = order.len();
        pending.retain(|&idx| {
            let p = &providers[idx];
            if p.prerequisites().iter().all(|r| satisfied.contains(r.as_str())) {
                satisfied.insert(p.name());
                order.push(idx);
                false
            } else {
                true
            }
        });

        if order.len() == before {
            return Err(ServiceError::DependencyCycle {
                service: service.to_string(),
                unresolved: pending.iter().map(|&i| providers[i].name().to_string()).collect(),
            });
        }
    }
    Ok(order)
}

/// Runs every provider in dependency order and collects the services they yield.
pub(crate) async fn resolve(
    service: &str,
    providers: &[RequirementProvider],
) -> Result<Vec<ServiceRef>, ServiceError> {
    let order = plan(service, providers)?;
    let mut collected: Vec<ServiceRef> = Vec::new();

    for idx in order {
        let p = &providers[idx];
        debug!(service, provider = p.name(), "getting requirements");

        let yielded = p.provide().await.map_err(|e| ServiceError::InvalidRequirements {
            service: service.to_string(),
            provider: p.name().to_string(),
            reason: e.to_string(),
        })?;

        for svc in yielded {
            if collected.iter().any(|known| Arc::ptr_eq(known, &svc)) {
                return Err(ServiceError::InvalidRequirements {
                    service: service.to_string(),
                    provider: p.name().to_string(),
                    reason: format!("service '{}' was already collected", svc.name()),
                });
            }
            debug!(service, provider = p.name(), nested = svc.name(), "nested service collected");
            collected.push(svc);
        }
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        core::Service,
        error::TaskError,
        test_support::{Probe, journal},
    };

    fn empty(name: &str, deps: &[&str]) -> RequirementProvider {
        RequirementProvider::new(name, deps.iter().copied(), || async { Ok(Vec::new()) })
    }

    fn names(providers: &[RequirementProvider], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| providers[i].name().to_string()).collect()
    }

    #[test]
    fn prerequisites_run_first_in_any_declaration_order() {
        let forward = [empty("p1", &[]), empty("p2", &["p1"])];
        let backward = [empty("p2", &["p1"]), empty("p1", &[])];

        assert_eq!(names(&forward, &plan("main", &forward).unwrap()), ["p1", "p2"]);
        assert_eq!(names(&backward, &plan("main", &backward).unwrap()), ["p1", "p2"]);
    }

    #[test]
    fn later_passes_pick_up_blocked_providers() {
        let providers = [
            empty("secondary", &["main"]),
            empty("main", &[]),
            empty("third", &["main", "secondary"]),
        ];
        let order = plan("svc", &providers).unwrap();
        assert_eq!(names(&providers, &order), ["main", "secondary", "third"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let providers = [empty("x", &["y"]), empty("y", &["x"]), empty("free", &[])];
        let err = plan("svc", &providers).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::DependencyCycle { ref unresolved, .. } if unresolved == &["x", "y"]
        ));

        let selfish = [empty("me", &["me"])];
        assert!(matches!(plan("svc", &selfish), Err(ServiceError::DependencyCycle { .. })));
    }

    #[test]
    fn undeclared_prerequisite_is_reported() {
        let providers = [empty("api", &["storage"])];
        let err = plan("svc", &providers).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::MissingRequirement { ref provider, ref missing, .. }
                if provider == "api" && missing == "storage"
        ));
    }

    #[tokio::test]
    async fn no_provider_runs_when_the_graph_is_unresolvable() {
        let calls = Arc::new(Mutex::new(0));
        let counted = |name: &str, dep: &str| {
            let calls = Arc::clone(&calls);
            RequirementProvider::new(name, [dep], move || {
                *calls.lock().unwrap() += 1;
                async { Ok(Vec::new()) }
            })
        };
        let providers = [counted("x", "y"), counted("y", "x")];

        let err = resolve("svc", &providers).await.err().expect("unresolvable graph");
        assert!(err.is_resolution());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn services_are_collected_in_resolution_order() {
        let j = journal();
        let db: ServiceRef = Probe::new("db", &j).arc();
        let api: ServiceRef = Probe::new("api", &j).arc();

        let api_p = {
            let api = Arc::clone(&api);
            RequirementProvider::new("api", ["db"], move || {
                let api = Arc::clone(&api);
                async move { Ok(vec![api]) }
            })
        };
        let db_p = {
            let db = Arc::clone(&db);
            RequirementProvider::new("db", [] as [&str; 0], move || {
                let db = Arc::clone(&db);
                async move { Ok(vec![db]) }
            })
        };

        let collected = resolve("svc", &[api_p, db_p]).await.unwrap();
        let names: Vec<&str> = collected.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["db", "api"]);
    }

    #[tokio::test]
    async fn provider_failure_and_duplicates_are_invalid() {
        let failing = RequirementProvider::new("broken", [] as [&str; 0], || async {
            Err(TaskError::fail("not a list"))
        });
        let err = resolve("svc", &[failing]).await.err().expect("provider error");
        assert!(matches!(
            err,
            ServiceError::InvalidRequirements { ref provider, .. } if provider == "broken"
        ));

        let j = journal();
        let shared: ServiceRef = Probe::new("shared", &j).arc();
        let twice = RequirementProvider::new("twice", [] as [&str; 0], move || {
            let shared = Arc::clone(&shared);
            async move { Ok(vec![Arc::clone(&shared), shared]) }
        });
        let err = resolve("svc", &[twice]).await.err().expect("duplicate instance");
        assert!(matches!(err, ServiceError::InvalidRequirements { .. }));
    }
}

//! # Example: basic_service
//!
//! A root service with a periodic worker pool, a one-shot warm-up task and two
//! nested services, one of which depends on the other.
//!
//! Demonstrates how to:
//! - Declare tasks with [`TaskConfig`] on a [`BaseService`].
//! - Provide nested services with [`RequirementProvider`] and prerequisites.
//! - Run until Ctrl-C (or until the service stops itself), then shut down.
//!
//! ## Flow
//! ```text
//! app.run_until_shutdown()
//!     ├─► start tasks: app.poll.0, app.poll.1, app.warmup.0
//!     ├─► providers: storage ──► api (requires storage)
//!     ├─► start nested: storage, api
//!     ├─► monitoring loop
//!     └─► SIGINT/SIGTERM ─► stop: api, storage, tasks
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic_service
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use servicevisor::{BaseService, RequirementProvider, ServiceRef, TaskConfig, TaskError};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn leaf(name: &str, every: Duration) -> anyhow::Result<ServiceRef> {
    let label = name.to_string();
    let svc = BaseService::builder(name)
        .task_fn("beat", TaskConfig::every(every), move |_ctx: CancellationToken| {
            let label = label.clone();
            async move {
                info!(service = %label, "beat");
                Ok::<_, TaskError>(())
            }
        })?
        .build();
    Ok(Arc::new(svc))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let polls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&polls);

    let storage = leaf("storage", Duration::from_secs(2))?;
    let api = leaf("api", Duration::from_secs(3))?;

    let app = BaseService::builder("app")
        .task_fn(
            "poll",
            TaskConfig::new(true, 0.5, 2)?,
            move |ctx: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    if ctx.is_cancelled() {
                        return Err(TaskError::Canceled);
                    }
                    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % 10 == 0 {
                        info!(polls = n, "still polling");
                    }
                    Ok(())
                }
            },
        )?
        .task_fn("warmup", TaskConfig::one_shot(), |_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            info!("caches warmed up");
            Ok(())
        })?
        .requirements(RequirementProvider::new("api", ["storage"], move || {
            let api = Arc::clone(&api);
            async move { Ok(vec![api]) }
        }))?
        .requirements(RequirementProvider::new("storage", [] as [&str; 0], move || {
            let storage = Arc::clone(&storage);
            async move { Ok(vec![storage]) }
        }))?
        .build();

    info!("press Ctrl-C to stop");
    app.run_until_shutdown().await?;
    info!(polls = polls.load(Ordering::Relaxed), "bye");
    Ok(())
}

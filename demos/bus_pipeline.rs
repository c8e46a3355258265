//! # Example: bus_pipeline
//!
//! Three services connected by a shared [`ServiceBus`]:
//!
//! ```text
//! producer (task) ── Order ──► billing ── Invoice ──► audit
//!                          └──────────────────────────► audit
//! ```
//!
//! - `producer` publishes an `Order` every 300ms from a periodic task.
//! - `billing` turns each order into an `Invoice`; every 5th order fails to
//!   show that a failing listener is only logged.
//! - `audit` listens to both types with one multi-type listener.
//!
//! Stops after a few seconds.
//!
//! ## Run
//! ```bash
//! RUST_LOG=servicevisor=debug,bus_pipeline=info cargo run --example bus_pipeline
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use servicevisor::{BaseService, Service, ServiceBus, TaskConfig, TaskError, TypeKey};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Order {
    id: u32,
    amount: u64,
}

#[derive(Debug)]
struct Invoice {
    order: u32,
    total: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bus = ServiceBus::new();

    let audit = BaseService::builder("audit")
        .with_bus(bus.clone())
        .listener_for(
            "record",
            &[TypeKey::of::<Order>(), TypeKey::of::<Invoice>()],
            |env| async move {
                if let Some(order) = env.downcast_ref::<Order>() {
                    info!(id = order.id, amount = order.amount, "audit: order");
                } else if let Some(invoice) = env.downcast_ref::<Invoice>() {
                    info!(order = invoice.order, total = invoice.total, "audit: invoice");
                }
                Ok(())
            },
        )?
        .build();

    let billing = {
        let bus = bus.clone();
        BaseService::builder("billing")
            .with_bus(bus.clone())
            .listener::<Order, _, _>("invoice", move |order| {
                let bus = bus.clone();
                async move {
                    if order.id % 5 == 0 {
                        return Err(TaskError::fail(format!("order {} rejected", order.id)));
                    }
                    bus.publish(Invoice {
                        order: order.id,
                        total: order.amount * 120 / 100,
                    });
                    Ok(())
                }
            })
            .build()
    };

    let next_id = Arc::new(AtomicU32::new(1));
    let producer = {
        let bus = bus.clone();
        BaseService::builder("producer")
            .with_bus(bus.clone())
            .task_fn(
                "orders",
                TaskConfig::every(Duration::from_millis(300)),
                move |_ctx: CancellationToken| {
                    let bus = bus.clone();
                    let id = next_id.fetch_add(1, Ordering::Relaxed);
                    async move {
                        let reached = bus.publish(Order {
                            id,
                            amount: u64::from(id) * 10,
                        });
                        info!(id, reached, "order published");
                        Ok(())
                    }
                },
            )?
            .build()
    };

    audit.start().await?;
    billing.start().await?;
    producer.start().await?;

    tokio::time::sleep(Duration::from_secs(3)).await;

    producer.stop().await?;
    billing.stop().await?;
    audit.stop().await?;
    Ok(())
}

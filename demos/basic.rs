//! Basic example assigning priorities across a few domains.
//!
//! Run with: `RUST_LOG=debug cargo run --example basic`

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use task_priority::{
    DomainRateConfig, DomainResolver, DomainSnapshot, InMemoryMetrics, PriorityAssigner,
    QueueType, QueuedTask, ResolveError,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Fixed domain table standing in for a metadata cache.
#[derive(Debug)]
struct StaticDomains(HashMap<String, DomainSnapshot>);

impl DomainResolver for StaticDomains {
    fn resolve_by_id(&self, domain_id: &str) -> Result<DomainSnapshot, ResolveError> {
        self.0
            .get(domain_id)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(domain_id))
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let domains = StaticDomains(HashMap::from([
        ("id-orders".to_string(), DomainSnapshot::local("orders")),
        ("id-noisy".to_string(), DomainSnapshot::local("noisy")),
        (
            "id-standby".to_string(),
            DomainSnapshot::global("billing", "cluster-b"),
        ),
    ]));

    let rates = DomainRateConfig::builder()
        .with_default_rate(1000.0)
        .with_domain_rate("noisy", 3.0)
        .build()
        .expect("valid rates");
    let metrics = InMemoryMetrics::new();

    let assigner = PriorityAssigner::builder("cluster-a")
        .with_resolver(Arc::new(domains))
        .with_rate_supplier(Arc::new(rates.clone()))
        .with_metrics(Arc::new(metrics.clone()))
        .build()
        .expect("valid assigner");

    println!("=== Task Priority Example ===\n");
    println!("Cluster: cluster-a, noisy domain limited to 3 tasks/sec\n");

    let tasks = [
        (QueueType::Transfer, "id-orders"),
        (QueueType::Timer, "id-orders"),
        (QueueType::Replication, "id-orders"),
        (QueueType::Transfer, "id-standby"),
        (QueueType::Transfer, "id-deleted"),
    ];
    for (queue_type, domain_id) in tasks {
        let mut task = QueuedTask::new(queue_type, domain_id);
        match assigner.assign(&mut task) {
            Ok(()) => println!(
                "{:<12} {:<11} -> {}",
                queue_type,
                domain_id,
                task.priority().map(|p| p.to_string()).unwrap_or_default()
            ),
            Err(err) => println!("{:<12} {:<11} -> error: {}", queue_type, domain_id, err),
        }
    }

    println!("\nBurst of 6 transfer tasks from the noisy domain:");
    for i in 1..=6 {
        let mut task = QueuedTask::new(QueueType::Transfer, "id-noisy");
        if assigner.assign(&mut task).is_ok() {
            println!("  task {}: {}", i, task.priority().map(|p| p.to_string()).unwrap_or_default());
        }
    }

    println!("\nRaising the noisy domain to 100 tasks/sec");
    if let Err(err) = rates.set_domain_rate("noisy", 100.0) {
        println!("  rejected: {}", err);
    }
    thread::sleep(Duration::from_millis(50));
    let mut task = QueuedTask::new(QueueType::Transfer, "id-noisy");
    if assigner.assign(&mut task).is_ok() {
        println!("  next task: {}", task.priority().map(|p| p.to_string()).unwrap_or_default());
    }

    let snapshot = metrics.snapshot();
    println!("\n=== Metrics ===");
    println!("High:      {}", snapshot.assigned_high);
    println!("Default:   {}", snapshot.assigned_default);
    println!("Low:       {}", snapshot.assigned_low);
    println!("Throttled: {:.0}%", snapshot.throttle_rate() * 100.0);
    println!("Limiters:  {:?}", assigner.registry().domain_names());
}

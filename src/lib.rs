//! # task-priority
//!
//! Priority assignment for tasks in a multi-tenant workflow engine.
//!
//! Every task dequeued from a transfer, timer or replication queue gets a
//! priority based on three things:
//! - **Queue type**: replication work is always low priority
//! - **Domain activity**: a replicated domain owned by another cluster is low priority here
//! - **Per-domain rate**: a domain over its configured rate is demoted so it
//!   cannot starve the others
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use task_priority::{
//!     DomainRateConfig, DomainResolver, DomainSnapshot, PriorityAssigner, QueueType,
//!     QueuedTask, ResolveError,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct MyDomainCache;
//!
//! impl DomainResolver for MyDomainCache {
//!     fn resolve_by_id(&self, domain_id: &str) -> Result<DomainSnapshot, ResolveError> {
//!         // Look up your metadata store here
//!         Ok(DomainSnapshot::global(domain_id, "cluster-a"))
//!     }
//! }
//!
//! let rates = DomainRateConfig::builder()
//!     .with_default_rate(1000.0)      // tasks/sec per domain
//!     .with_domain_rate("noisy", 50.0)
//!     .build()
//!     .unwrap();
//!
//! let assigner = PriorityAssigner::builder("cluster-a")
//!     .with_resolver(Arc::new(MyDomainCache))
//!     .with_rate_supplier(Arc::new(rates.clone()))
//!     .build()
//!     .unwrap();
//!
//! let mut task = QueuedTask::new(QueueType::Transfer, "orders");
//! assigner.assign(&mut task)?;
//! println!("priority: {}", task.priority().unwrap());
//!
//! // Rates can change at any time; limiters pick it up on the next check
//! rates.set_domain_rate("noisy", 10.0).unwrap();
//! # Ok::<(), ResolveError>(())
//! ```
//!
//! ## Decision
//!
//! | Task                                           | Priority           |
//! |------------------------------------------------|--------------------|
//! | Replication                                    | (Low, Default)     |
//! | Domain global and active in another cluster    | (Low, Default)     |
//! | Domain over its rate                           | (Default, Default) |
//! | Otherwise                                      | (High, Default)    |
//!
//! A domain the resolver reports as not found is treated as active, so tasks of
//! a deleted domain still drain. Any other resolver error is returned unchanged
//! and the task is left as it was.
//!
//! ## Priority Encoding
//!
//! [`TaskPriority`] packs (class, subclass) into one `u8`, three bits per
//! level. Comparing the scalars orders tasks by class first, then subclass,
//! and a larger value is more urgent.
//!
//! ## Rate Limiters
//!
//! Each domain name gets one [`DynamicRateLimiter`], created the first time the
//! name is seen and kept for the life of the assigner. The limiter asks its
//! [`RateSupplier`] for the current rate on every check; the burst is one
//! second's worth of tokens. A rate of zero demotes every task of the domain.
//!
//! The registry never forgets a domain. Memory grows with the number of
//! distinct domain names ever seen, one small limiter each.
//!
//! ## Observability
//!
//! Plug any [`AssignerMetrics`] sink into the builder:
//! - [`InMemoryMetrics`] for counters you can read back
//! - `MetricsFacade` (feature `metrics-rs`) to feed the `metrics` crate
//! - [`NoopMetrics`], the default
//!
//! Resolution failures are logged through `tracing` at `WARN` with a
//! `domain_id` field.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::{Admission, TokenBucket},
    priority::{InvalidPriority, PriorityClass, PrioritySubclass, TaskPriority},
    snapshot::DomainSnapshot,
    task::{QueueType, QueuedTask, Task},
};

pub use application::{
    assigner::PriorityAssigner,
    limiter::{DynamicRateLimiter, RateFn},
    metrics::{InMemoryMetrics, MetricsSnapshot, NoopMetrics},
    ports::{AssignerMetrics, Clock, DomainResolver, RateSupplier, ResolveError, Storage},
    registry::LimiterRegistry,
};

pub use infrastructure::{
    builder::{BuildError, DefaultPriorityAssigner, PriorityAssignerBuilder, SharedLimiterStorage},
    clock::SystemClock,
    config::{DomainRateConfig, DomainRateConfigBuilder, DEFAULT_DOMAIN_RATE},
    storage::ShardedStorage,
};

#[cfg(feature = "metrics-rs")]
pub use infrastructure::metrics_facade::MetricsFacade;

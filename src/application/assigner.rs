//! Priority assignment decision.
//!
//! The assigner routes a task by queue type, checks whether its domain is
//! active in this cluster, asks the domain's limiter for admission, and writes
//! the resulting priority onto the task:
//!
//! | Condition                                   | Priority          |
//! |---------------------------------------------|-------------------|
//! | Replication task                            | (Low, Default)    |
//! | Domain active in another cluster            | (Low, Default)    |
//! | Domain active here, limiter denies          | (Default, Default)|
//! | Domain active here (or unknown), admitted   | (High, Default)   |

use crate::application::limiter::DynamicRateLimiter;
use crate::application::ports::{AssignerMetrics, DomainResolver, ResolveError, Storage};
use crate::application::registry::LimiterRegistry;
use crate::domain::priority::TaskPriority;
use crate::domain::task::{QueueType, Task};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records elapsed time into a metrics sink when dropped.
///
/// Dropping on every exit path, including `?` returns, means the timer can
/// never be left running.
struct LatencyTimer<'a> {
    metrics: &'a dyn AssignerMetrics,
    started: Instant,
    record: fn(&dyn AssignerMetrics, Duration),
}

impl<'a> LatencyTimer<'a> {
    fn assignment(metrics: &'a dyn AssignerMetrics) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            record: |m, elapsed| m.record_assign_latency(elapsed),
        }
    }

    fn domain_lookup(metrics: &'a dyn AssignerMetrics) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            record: |m, elapsed| m.record_domain_lookup_latency(elapsed),
        }
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        (self.record)(self.metrics, self.started.elapsed());
    }
}

/// What the assigner needs to know about a task's domain.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DomainInfo {
    /// Limiter key; empty when the domain could not be found
    name: String,
    active: bool,
}

/// Assigns priorities to tasks on dequeue.
///
/// Cheap to share across worker threads behind an `Arc`; all methods take
/// `&self`.
pub struct PriorityAssigner<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    current_cluster_name: String,
    resolver: Arc<dyn DomainResolver>,
    registry: LimiterRegistry<S>,
    metrics: Arc<dyn AssignerMetrics>,
}

impl<S> PriorityAssigner<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    /// Create a new assigner.
    ///
    /// # Arguments
    /// * `current_cluster_name` - Name of the cluster this process belongs to
    /// * `resolver` - Domain metadata lookup
    /// * `registry` - Per-domain limiters (which carry the rate supplier and clock)
    /// * `metrics` - Metrics sink
    pub fn new(
        current_cluster_name: impl Into<String>,
        resolver: Arc<dyn DomainResolver>,
        registry: LimiterRegistry<S>,
        metrics: Arc<dyn AssignerMetrics>,
    ) -> Self {
        Self {
            current_cluster_name: current_cluster_name.into(),
            resolver,
            registry,
            metrics,
        }
    }

    /// Assign a priority to `task`.
    ///
    /// On success exactly one priority has been written to the task. On error
    /// the task is untouched and the resolver's error is returned as is; a
    /// domain that cannot be found is not an error and is treated as active.
    ///
    /// # Performance
    /// One resolver call and one shared-lock map lookup in the common case.
    /// Replication tasks return before either.
    pub fn assign<T>(&self, task: &mut T) -> Result<(), ResolveError>
    where
        T: Task + ?Sized,
    {
        let _timer = LatencyTimer::assignment(&*self.metrics);

        let queue_type = task.queue_type();
        if queue_type == QueueType::Replication {
            self.set_priority(task, TaskPriority::LOW);
            return Ok(());
        }

        let domain = self.domain_info(task.domain_id())?;

        if !domain.active {
            self.set_priority(task, TaskPriority::LOW);
            return Ok(());
        }

        if !self.registry.get_limiter(&domain.name).allow() {
            self.set_priority(task, TaskPriority::DEFAULT);
            self.metrics.record_throttled(queue_type, &domain.name);
            tracing::trace!(
                domain_name = %domain.name,
                queue_type = %queue_type,
                "task throttled"
            );
            return Ok(());
        }

        self.set_priority(task, TaskPriority::HIGH);
        Ok(())
    }

    fn set_priority<T>(&self, task: &mut T, priority: TaskPriority)
    where
        T: Task + ?Sized,
    {
        task.set_priority(priority);
        self.metrics.record_assigned(priority);
        tracing::trace!(
            domain_id = task.domain_id(),
            priority = %priority,
            "priority assigned"
        );
    }

    fn domain_info(&self, domain_id: &str) -> Result<DomainInfo, ResolveError> {
        let _timer = LatencyTimer::domain_lookup(&*self.metrics);

        match self.resolver.resolve_by_id(domain_id) {
            Ok(domain) => Ok(DomainInfo {
                active: domain.is_active_in(&self.current_cluster_name),
                name: domain.name,
            }),
            Err(err) if err.is_not_found() => {
                // A deleted domain may still have tasks in flight; don't starve them.
                tracing::warn!(domain_id, "Cannot find domain, treating as active");
                Ok(DomainInfo {
                    name: String::new(),
                    active: true,
                })
            }
            Err(err) => {
                tracing::warn!(domain_id, error = %err, "Cannot find domain");
                Err(err)
            }
        }
    }

    /// Name of the cluster this assigner runs in.
    pub fn current_cluster_name(&self) -> &str {
        &self.current_cluster_name
    }

    /// Get a reference to the limiter registry.
    pub fn registry(&self) -> &LimiterRegistry<S> {
        &self.registry
    }
}

impl<S> fmt::Debug for PriorityAssigner<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityAssigner")
            .field("current_cluster_name", &self.current_cluster_name)
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metrics::InMemoryMetrics;
    use crate::domain::priority::PriorityClass;
    use crate::domain::snapshot::DomainSnapshot;
    use crate::domain::task::QueuedTask;
    use crate::infrastructure::mocks::{MockClock, MockDomainResolver};
    use crate::infrastructure::storage::ShardedStorage;
    use std::io;

    const CLUSTER: &str = "cluster-a";

    struct Fixture {
        assigner: PriorityAssigner<Arc<ShardedStorage<String, Arc<DynamicRateLimiter>>>>,
        resolver: MockDomainResolver,
        metrics: InMemoryMetrics,
    }

    fn fixture(rate: f64) -> Fixture {
        let resolver = MockDomainResolver::new();
        let metrics = InMemoryMetrics::new();
        let registry = LimiterRegistry::new(
            Arc::new(ShardedStorage::new()),
            Arc::new(move |_: &str| rate),
            Arc::new(MockClock::new(Instant::now())),
        );
        let assigner = PriorityAssigner::new(
            CLUSTER,
            Arc::new(resolver.clone()),
            registry,
            Arc::new(metrics.clone()),
        );
        Fixture {
            assigner,
            resolver,
            metrics,
        }
    }

    #[test]
    fn test_replication_is_low_without_lookups() {
        let f = fixture(100.0);
        let mut task = QueuedTask::new(QueueType::Replication, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::LOW));
        assert_eq!(f.resolver.calls(), 0);
        assert!(f.assigner.registry().is_empty());
        assert_eq!(f.metrics.lookups_timed(), 0);
        assert_eq!(f.metrics.assignments_timed(), 1);
    }

    #[test]
    fn test_admitted_domain_is_high() {
        let f = fixture(100.0);
        f.resolver.insert("d1", DomainSnapshot::local("orders"));
        let mut task = QueuedTask::new(QueueType::Transfer, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::HIGH));
        assert!(f.assigner.registry().contains("orders"));
        assert_eq!(f.metrics.throttled(QueueType::Transfer), 0);
    }

    #[test]
    fn test_throttled_transfer_is_default() {
        let f = fixture(0.0);
        f.resolver.insert("d1", DomainSnapshot::local("d1"));
        let mut task = QueuedTask::new(QueueType::Transfer, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::DEFAULT));
        assert_eq!(f.metrics.throttled(QueueType::Transfer), 1);
        assert_eq!(f.metrics.throttled(QueueType::Timer), 0);
        assert_eq!(f.metrics.throttled_for_domain("d1"), 1);
    }

    #[test]
    fn test_throttled_timer_counts_timer() {
        let f = fixture(0.0);
        f.resolver.insert("d1", DomainSnapshot::local("d1"));
        let mut task = QueuedTask::new(QueueType::Timer, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::DEFAULT));
        assert_eq!(f.metrics.throttled(QueueType::Timer), 1);
        assert_eq!(f.metrics.throttled(QueueType::Transfer), 0);
    }

    #[test]
    fn test_standby_domain_is_low_without_limiter() {
        let f = fixture(0.0);
        f.resolver
            .insert("d1", DomainSnapshot::global("d1", "cluster-b"));
        let mut task = QueuedTask::new(QueueType::Transfer, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::LOW));
        assert!(f.assigner.registry().is_empty());
        assert_eq!(f.metrics.throttled(QueueType::Transfer), 0);
    }

    #[test]
    fn test_global_domain_active_here_uses_limiter() {
        let f = fixture(100.0);
        f.resolver.insert("d1", DomainSnapshot::global("d1", CLUSTER));
        let mut task = QueuedTask::new(QueueType::Timer, "d1");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::HIGH));
    }

    #[test]
    fn test_not_found_fails_open() {
        let f = fixture(100.0);
        f.resolver.insert_error("gone", || ResolveError::not_found("gone"));
        let mut task = QueuedTask::new(QueueType::Transfer, "gone");

        f.assigner.assign(&mut task).unwrap();

        assert_eq!(task.priority(), Some(TaskPriority::HIGH));
        // Unknown domains share the empty-name limiter
        assert!(f.assigner.registry().contains(""));
    }

    #[test]
    fn test_other_error_propagates_and_leaves_task() {
        let f = fixture(100.0);
        f.resolver.insert_error("d1", || {
            ResolveError::unavailable(io::Error::new(io::ErrorKind::Other, "store down"))
        });
        let mut task = QueuedTask::new(QueueType::Transfer, "d1");

        let err = f.assigner.assign(&mut task).unwrap_err();

        assert!(matches!(err, ResolveError::Unavailable(_)));
        assert_eq!(err.to_string(), "domain lookup failed: store down");
        assert_eq!(task.priority(), None);
        assert!(f.assigner.registry().is_empty());
        assert_eq!(f.metrics.snapshot().total_assigned(), 0);
        // Both timers still stop on the error path
        assert_eq!(f.metrics.assignments_timed(), 1);
        assert_eq!(f.metrics.lookups_timed(), 1);
    }

    #[test]
    fn test_every_call_is_timed() {
        let f = fixture(1.0);
        f.resolver.insert("d1", DomainSnapshot::local("d1"));
        f.resolver
            .insert("d2", DomainSnapshot::global("d2", "cluster-b"));

        for (queue_type, domain_id) in [
            (QueueType::Replication, "d1"),
            (QueueType::Transfer, "d1"),
            (QueueType::Transfer, "d1"),
            (QueueType::Timer, "d2"),
        ] {
            let mut task = QueuedTask::new(queue_type, domain_id);
            f.assigner.assign(&mut task).unwrap();
        }

        let snapshot = f.metrics.snapshot();
        assert_eq!(snapshot.assign_count, 4);
        assert_eq!(snapshot.lookup_count, 3);
        assert_eq!(snapshot.assigned_high, 1);
        assert_eq!(snapshot.assigned_default, 1);
        assert_eq!(snapshot.assigned_low, 2);
    }

    #[test]
    fn test_reassignment_overwrites() {
        let f = fixture(1.0);
        f.resolver.insert("d1", DomainSnapshot::local("d1"));
        let mut task = QueuedTask::new(QueueType::Transfer, "d1");

        f.assigner.assign(&mut task).unwrap();
        assert_eq!(task.priority(), Some(TaskPriority::HIGH));

        // Burst of one is spent
        f.assigner.assign(&mut task).unwrap();
        assert_eq!(task.priority(), Some(TaskPriority::DEFAULT));
    }

    #[test]
    fn test_assign_through_trait_object() {
        let f = fixture(100.0);
        f.resolver.insert("d1", DomainSnapshot::local("d1"));
        let mut task = QueuedTask::new(QueueType::Timer, "d1");
        let dyn_task: &mut dyn Task = &mut task;

        f.assigner.assign(dyn_task).unwrap();

        assert_eq!(task.priority().map(|p| p.class()), Some(PriorityClass::High));
    }
}

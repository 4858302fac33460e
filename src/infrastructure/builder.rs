//! Composition root for the assigner.
//!
//! Wires the production adapters (sharded storage, system clock, in-memory
//! rate config) behind the application layer's ports.

use crate::application::assigner::PriorityAssigner;
use crate::application::limiter::DynamicRateLimiter;
use crate::application::metrics::NoopMetrics;
use crate::application::ports::{AssignerMetrics, Clock, DomainResolver, RateSupplier};
use crate::application::registry::LimiterRegistry;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::DomainRateConfig;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;

/// Storage used by assigners built with [`PriorityAssignerBuilder`].
pub type SharedLimiterStorage = Arc<ShardedStorage<String, Arc<DynamicRateLimiter>>>;

/// Assigner over the default sharded storage.
pub type DefaultPriorityAssigner = PriorityAssigner<SharedLimiterStorage>;

/// Error returned when building an assigner or a rate config fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The current cluster name is needed to tell active from standby domains
    #[error("current cluster name must not be empty")]
    EmptyClusterName,
    /// No domain resolver was supplied
    #[error("a domain resolver is required")]
    MissingResolver,
    /// A rate was negative, NaN or infinite
    #[error("invalid rate {rate} for {scope}: must be finite and non-negative")]
    InvalidRate {
        /// `default` or the domain name
        scope: String,
        /// Offending value
        rate: f64,
    },
}

/// Builder for constructing a [`PriorityAssigner`].
///
/// # Example
/// ```
/// use task_priority::{
///     DomainRateConfig, DomainSnapshot, PriorityAssigner, QueueType, QueuedTask, TaskPriority,
/// };
/// use task_priority::infrastructure::mocks::MockDomainResolver;
/// use std::sync::Arc;
///
/// let resolver = MockDomainResolver::new();
/// resolver.insert("id-1", DomainSnapshot::local("orders"));
///
/// let assigner = PriorityAssigner::builder("cluster-a")
///     .with_resolver(Arc::new(resolver))
///     .with_rate_supplier(Arc::new(DomainRateConfig::new()))
///     .build()
///     .unwrap();
///
/// let mut task = QueuedTask::new(QueueType::Transfer, "id-1");
/// assigner.assign(&mut task).unwrap();
/// assert_eq!(task.priority(), Some(TaskPriority::HIGH));
/// ```
pub struct PriorityAssignerBuilder {
    current_cluster_name: String,
    resolver: Option<Arc<dyn DomainResolver>>,
    rates: Option<Arc<dyn RateSupplier>>,
    metrics: Option<Arc<dyn AssignerMetrics>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PriorityAssigner<SharedLimiterStorage> {
    /// Create a builder for an assigner running in `current_cluster_name`.
    pub fn builder(current_cluster_name: impl Into<String>) -> PriorityAssignerBuilder {
        PriorityAssignerBuilder {
            current_cluster_name: current_cluster_name.into(),
            resolver: None,
            rates: None,
            metrics: None,
            clock: None,
        }
    }
}

impl PriorityAssignerBuilder {
    /// Set the domain metadata lookup. Required.
    pub fn with_resolver(mut self, resolver: Arc<dyn DomainResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the per-domain rate source.
    ///
    /// Default: a fresh [`DomainRateConfig`] at 1000 tasks per second per domain.
    pub fn with_rate_supplier(mut self, rates: Arc<dyn RateSupplier>) -> Self {
        self.rates = Some(rates);
        self
    }

    /// Set the metrics sink.
    ///
    /// Default: [`NoopMetrics`].
    pub fn with_metrics(mut self, metrics: Arc<dyn AssignerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the assigner.
    ///
    /// # Errors
    /// Returns an error if the cluster name is empty or no resolver was set.
    pub fn build(self) -> Result<DefaultPriorityAssigner, BuildError> {
        if self.current_cluster_name.is_empty() {
            return Err(BuildError::EmptyClusterName);
        }
        let resolver = self.resolver.ok_or(BuildError::MissingResolver)?;
        let rates = self
            .rates
            .unwrap_or_else(|| Arc::new(DomainRateConfig::new()));
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        let registry = LimiterRegistry::new(Arc::new(ShardedStorage::new()), rates, clock);

        tracing::debug!(
            cluster = %self.current_cluster_name,
            "priority assigner built"
        );
        Ok(PriorityAssigner::new(
            self.current_cluster_name,
            resolver,
            registry,
            metrics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metrics::InMemoryMetrics;
    use crate::domain::priority::TaskPriority;
    use crate::domain::snapshot::DomainSnapshot;
    use crate::domain::task::{QueueType, QueuedTask};
    use crate::infrastructure::mocks::{MockClock, MockDomainResolver};
    use std::time::{Duration, Instant};

    #[test]
    fn test_build_requires_resolver() {
        let err = PriorityAssigner::builder("cluster-a").build().unwrap_err();
        assert_eq!(err, BuildError::MissingResolver);
    }

    #[test]
    fn test_build_rejects_empty_cluster() {
        let err = PriorityAssigner::builder("")
            .with_resolver(Arc::new(MockDomainResolver::new()))
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::EmptyClusterName);
        assert_eq!(err.to_string(), "current cluster name must not be empty");
    }

    #[test]
    fn test_build_with_defaults() {
        let assigner = PriorityAssigner::builder("cluster-a")
            .with_resolver(Arc::new(MockDomainResolver::new()))
            .build()
            .unwrap();

        assert_eq!(assigner.current_cluster_name(), "cluster-a");
        assert!(assigner.registry().is_empty());
    }

    #[test]
    fn test_live_rate_change_through_builder() {
        let resolver = MockDomainResolver::new();
        resolver.insert("id-1", DomainSnapshot::local("d1"));
        let rates = DomainRateConfig::builder()
            .with_domain_rate("d1", 0.0)
            .build()
            .unwrap();
        let clock = MockClock::new(Instant::now());
        let metrics = InMemoryMetrics::new();

        let assigner = PriorityAssigner::builder("cluster-a")
            .with_resolver(Arc::new(resolver))
            .with_rate_supplier(Arc::new(rates.clone()))
            .with_metrics(Arc::new(metrics.clone()))
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap();

        let mut task = QueuedTask::new(QueueType::Timer, "id-1");
        assigner.assign(&mut task).unwrap();
        assert_eq!(task.priority(), Some(TaskPriority::DEFAULT));

        rates.set_domain_rate("d1", 1.0).unwrap();
        clock.advance(Duration::from_secs(1));
        assigner.assign(&mut task).unwrap();
        assert_eq!(task.priority(), Some(TaskPriority::HIGH));

        assert_eq!(assigner.registry().len(), 1);
        assert_eq!(metrics.throttled(QueueType::Timer), 1);
    }

    #[test]
    fn test_invalid_rate_display() {
        let err = BuildError::InvalidRate {
            scope: "d1".to_string(),
            rate: -2.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid rate -2 for d1: must be finite and non-negative"
        );
    }
}

//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::priority::TaskPriority;
use crate::domain::snapshot::DomainSnapshot;
use crate::domain::task::QueueType;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Error returned by a [`DomainResolver`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The domain does not exist (for example, it was deleted).
    #[error("domain {domain_id} not found")]
    NotFound {
        /// Identifier that failed to resolve
        domain_id: String,
    },
    /// Any other failure, such as the metadata store being unreachable.
    #[error("domain lookup failed: {0}")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl ResolveError {
    /// Shorthand for a not-found error.
    pub fn not_found(domain_id: impl Into<String>) -> Self {
        ResolveError::NotFound {
            domain_id: domain_id.into(),
        }
    }

    /// Wrap an arbitrary failure.
    pub fn unavailable<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        ResolveError::Unavailable(err.into())
    }

    /// Check if this is the not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Port for domain metadata lookups.
///
/// Implementations own their caching and invalidation; the assigner calls
/// this on every assignment and never caches the result.
pub trait DomainResolver: Send + Sync + Debug {
    /// Look up a domain by identifier.
    fn resolve_by_id(&self, domain_id: &str) -> Result<DomainSnapshot, ResolveError>;
}

/// Port for per-domain rate configuration.
///
/// Queried on every admission check, so implementations should be cheap and
/// must not block.
pub trait RateSupplier: Send + Sync {
    /// Tasks per second currently allowed for `domain_name`.
    fn current_rate(&self, domain_name: &str) -> f64;
}

impl<F> RateSupplier for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn current_rate(&self, domain_name: &str) -> f64 {
        self(domain_name)
    }
}

/// Port for assigner observability.
///
/// Infrastructure provides concrete implementations (InMemoryMetrics,
/// MetricsFacade, NoopMetrics).
pub trait AssignerMetrics: Send + Sync + Debug {
    /// Latency of a whole assignment, recorded on every exit path.
    fn record_assign_latency(&self, elapsed: Duration);

    /// Latency of the domain lookup inside an assignment.
    fn record_domain_lookup_latency(&self, elapsed: Duration);

    /// A transfer or timer task was throttled for `domain_name`.
    fn record_throttled(&self, queue_type: QueueType, domain_name: &str);

    /// A priority was written to a task.
    fn record_assigned(&self, _priority: TaskPriority) {}
}

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Entries are only ever added. The two-step API lets callers keep value
/// construction outside of any lock: look up with [`Storage::get`], build the
/// value on a miss, then publish it with [`Storage::insert_if_absent`], which
/// hands back whichever value won the race.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Look up a value under a shared lock.
    fn get(&self, key: &K) -> Option<V>;

    /// Insert `value` unless the key is already present.
    ///
    /// Returns the value stored for `key` after the call: the existing one if
    /// another caller got there first, `value` otherwise.
    fn insert_if_absent(&self, key: K, value: V) -> V;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);
}

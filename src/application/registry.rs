//! Lazily populated registry of per-domain rate limiters.
//!
//! The registry maps a domain name to exactly one [`DynamicRateLimiter`] for
//! its whole lifetime. Entries are created on first use and never removed.

use crate::application::limiter::DynamicRateLimiter;
use crate::application::ports::{Clock, RateSupplier, Storage};
use std::fmt;
use std::sync::Arc;

/// Registry managing one limiter per domain name.
///
/// Uses the Storage port for concurrent access.
///
/// This type is generic over the storage implementation, allowing different
/// storage backends to be used. In production, use `Arc<ShardedStorage>`.
#[derive(Clone)]
pub struct LimiterRegistry<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    storage: S,
    rates: Arc<dyn RateSupplier>,
    clock: Arc<dyn Clock>,
}

impl<S> LimiterRegistry<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    /// Create a new registry with storage, a rate supplier and a clock.
    pub fn new(storage: S, rates: Arc<dyn RateSupplier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            rates,
            clock,
        }
    }

    /// Get the limiter for `domain_name`, creating it on first use.
    ///
    /// Concurrent first calls for the same name all receive the same `Arc`.
    /// A lookup for a name already present only takes a shared lock.
    pub fn get_limiter(&self, domain_name: &str) -> Arc<DynamicRateLimiter> {
        let key = domain_name.to_owned();
        if let Some(limiter) = self.storage.get(&key) {
            return limiter;
        }

        // Built without holding any lock; dropped if another caller wins.
        let candidate = Arc::new(self.build_limiter(domain_name));

        let limiter = self.storage.insert_if_absent(key, Arc::clone(&candidate));
        if Arc::ptr_eq(&limiter, &candidate) {
            tracing::debug!(domain_name, "created rate limiter for domain");
        }
        limiter
    }

    fn build_limiter(&self, domain_name: &str) -> DynamicRateLimiter {
        let rates = Arc::clone(&self.rates);
        let name = domain_name.to_owned();
        DynamicRateLimiter::new(
            Arc::new(move || rates.current_rate(&name)),
            Arc::clone(&self.clock),
        )
    }

    /// Check whether a limiter exists for `domain_name`.
    pub fn contains(&self, domain_name: &str) -> bool {
        self.storage.get(&domain_name.to_owned()).is_some()
    }

    /// Names of all domains with a limiter, in no particular order.
    pub fn domain_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.storage.len());
        self.storage.for_each(|name, _| names.push(name.clone()));
        names
    }

    /// Get the number of registered limiters.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl<S> fmt::Debug for LimiterRegistry<S>
where
    S: Storage<String, Arc<DynamicRateLimiter>> + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("storage", &self.storage)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

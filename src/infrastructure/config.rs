//! In-memory per-domain rate configuration.
//!
//! [`DomainRateConfig`] is a [`RateSupplier`] whose values can be changed while
//! the assigner is running. Limiters read it on every admission check, so a
//! change applies to the next task of the affected domain.

use crate::application::ports::RateSupplier;
use crate::infrastructure::builder::BuildError;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tasks per second allowed per domain when nothing else is configured.
pub const DEFAULT_DOMAIN_RATE: f64 = 1000.0;

fn validate(scope: &str, rate: f64) -> Result<f64, BuildError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(rate)
    } else {
        Err(BuildError::InvalidRate {
            scope: scope.to_string(),
            rate,
        })
    }
}

/// Live per-domain rate table with a default.
///
/// Clones share the same table, so a host can hand one clone to the assigner
/// and keep another for updates.
///
/// # Example
/// ```
/// use task_priority::{DomainRateConfig, RateSupplier};
///
/// let config = DomainRateConfig::builder()
///     .with_default_rate(200.0)
///     .with_domain_rate("noisy", 5.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.current_rate("noisy"), 5.0);
/// assert_eq!(config.current_rate("quiet"), 200.0);
///
/// config.set_domain_rate("quiet", 50.0).unwrap();
/// assert_eq!(config.current_rate("quiet"), 50.0);
/// ```
#[derive(Debug, Clone)]
pub struct DomainRateConfig {
    inner: Arc<ConfigInner>,
}

#[derive(Debug)]
struct ConfigInner {
    default_rate_bits: AtomicU64,
    overrides: DashMap<String, f64, RandomState>,
}

impl DomainRateConfig {
    /// Create a config with [`DEFAULT_DOMAIN_RATE`] and no overrides.
    pub fn new() -> Self {
        Self::with_default(DEFAULT_DOMAIN_RATE)
    }

    fn with_default(default_rate: f64) -> Self {
        Self {
            inner: Arc::new(ConfigInner {
                default_rate_bits: AtomicU64::new(default_rate.to_bits()),
                overrides: DashMap::with_hasher(RandomState::new()),
            }),
        }
    }

    /// Create a builder for a validated config.
    pub fn builder() -> DomainRateConfigBuilder {
        DomainRateConfigBuilder {
            default_rate: DEFAULT_DOMAIN_RATE,
            overrides: Vec::new(),
        }
    }

    /// Rate applied to domains without an override.
    pub fn default_rate(&self) -> f64 {
        f64::from_bits(self.inner.default_rate_bits.load(Ordering::Relaxed))
    }

    /// Change the rate for domains without an override.
    pub fn set_default_rate(&self, rate: f64) -> Result<(), BuildError> {
        let rate = validate("default", rate)?;
        self.inner
            .default_rate_bits
            .store(rate.to_bits(), Ordering::Relaxed);
        tracing::debug!(rate, "default domain rate updated");
        Ok(())
    }

    /// Override the rate for one domain.
    pub fn set_domain_rate(&self, domain_name: &str, rate: f64) -> Result<(), BuildError> {
        let rate = validate(domain_name, rate)?;
        self.inner.overrides.insert(domain_name.to_owned(), rate);
        tracing::debug!(domain_name, rate, "domain rate override set");
        Ok(())
    }

    /// Drop a domain's override so it falls back to the default.
    ///
    /// Returns the removed rate, if there was one.
    pub fn clear_domain_rate(&self, domain_name: &str) -> Option<f64> {
        self.inner
            .overrides
            .remove(domain_name)
            .map(|(_, rate)| rate)
    }

    /// The override for `domain_name`, if any.
    pub fn domain_rate(&self, domain_name: &str) -> Option<f64> {
        self.inner.overrides.get(domain_name).map(|rate| *rate)
    }
}

impl Default for DomainRateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RateSupplier for DomainRateConfig {
    fn current_rate(&self, domain_name: &str) -> f64 {
        self.domain_rate(domain_name)
            .unwrap_or_else(|| self.default_rate())
    }
}

/// Builder for constructing a [`DomainRateConfig`].
#[derive(Debug, Clone)]
pub struct DomainRateConfigBuilder {
    default_rate: f64,
    overrides: Vec<(String, f64)>,
}

impl DomainRateConfigBuilder {
    /// Set the rate for domains without an override.
    ///
    /// Default: 1000 tasks per second.
    pub fn with_default_rate(mut self, rate: f64) -> Self {
        self.default_rate = rate;
        self
    }

    /// Override the rate for one domain. Later calls for the same name win.
    pub fn with_domain_rate(mut self, domain_name: impl Into<String>, rate: f64) -> Self {
        self.overrides.push((domain_name.into(), rate));
        self
    }

    /// Validate and build the config.
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidRate`] if any rate is negative or not finite.
    pub fn build(self) -> Result<DomainRateConfig, BuildError> {
        let config = DomainRateConfig::with_default(validate("default", self.default_rate)?);
        for (domain_name, rate) in self.overrides {
            let rate = validate(&domain_name, rate)?;
            config.inner.overrides.insert(domain_name, rate);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DomainRateConfig::new();
        assert_eq!(config.default_rate(), DEFAULT_DOMAIN_RATE);
        assert_eq!(config.current_rate("anything"), DEFAULT_DOMAIN_RATE);
        assert_eq!(config.domain_rate("anything"), None);
    }

    #[test]
    fn test_override_and_clear() {
        let config = DomainRateConfig::new();
        config.set_domain_rate("d1", 3.0).unwrap();
        assert_eq!(config.current_rate("d1"), 3.0);

        assert_eq!(config.clear_domain_rate("d1"), Some(3.0));
        assert_eq!(config.current_rate("d1"), DEFAULT_DOMAIN_RATE);
        assert_eq!(config.clear_domain_rate("d1"), None);
    }

    #[test]
    fn test_clones_share_updates() {
        let config = DomainRateConfig::new();
        let handle = config.clone();

        handle.set_default_rate(10.0).unwrap();
        handle.set_domain_rate("d1", 0.0).unwrap();

        assert_eq!(config.current_rate("d2"), 10.0);
        assert_eq!(config.current_rate("d1"), 0.0);
    }

    #[test]
    fn test_builder_last_override_wins() {
        let config = DomainRateConfig::builder()
            .with_domain_rate("d1", 1.0)
            .with_domain_rate("d1", 2.0)
            .build()
            .unwrap();
        assert_eq!(config.current_rate("d1"), 2.0);
    }

    #[test]
    fn test_builder_rejects_invalid_rates() {
        let err = DomainRateConfig::builder()
            .with_default_rate(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidRate { ref scope, .. } if scope == "default"));

        let err = DomainRateConfig::builder()
            .with_domain_rate("d1", f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidRate { ref scope, .. } if scope == "d1"));
    }

    #[test]
    fn test_setters_reject_invalid_rates() {
        let config = DomainRateConfig::new();
        assert!(config.set_default_rate(f64::INFINITY).is_err());
        assert!(config.set_domain_rate("d1", -0.5).is_err());
        assert_eq!(config.default_rate(), DEFAULT_DOMAIN_RATE);
        assert_eq!(config.domain_rate("d1"), None);
    }
}

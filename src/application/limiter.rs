//! Per-domain limiter with a live rate.
//!
//! A [`DynamicRateLimiter`] pairs a token bucket with a rate function that is
//! re-evaluated on every admission check, so configuration changes apply
//! without recreating the limiter.

use crate::application::ports::Clock;
use crate::domain::bucket::{Admission, TokenBucket};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Function returning the rate, in tasks per second, in effect right now.
pub type RateFn = Arc<dyn Fn() -> f64 + Send + Sync + 'static>;

/// Non-blocking admission check bound to a dynamic rate.
pub struct DynamicRateLimiter {
    rate: RateFn,
    clock: Arc<dyn Clock>,
    bucket: Mutex<TokenBucket>,
}

impl DynamicRateLimiter {
    /// Create a limiter reading its rate from `rate` on each check.
    ///
    /// # Example
    /// ```
    /// use task_priority::{DynamicRateLimiter, SystemClock};
    /// use std::sync::Arc;
    ///
    /// let limiter = DynamicRateLimiter::new(Arc::new(|| 0.0), Arc::new(SystemClock::new()));
    /// assert!(!limiter.allow());
    /// ```
    pub fn new(rate: RateFn, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate,
            clock,
            bucket: Mutex::new(TokenBucket::new()),
        }
    }

    /// Try to admit one unit of work right now.
    ///
    /// The rate function is called before taking the bucket lock.
    pub fn allow(&self) -> bool {
        self.check().is_allow()
    }

    /// Same as [`allow`](Self::allow), returning the admission decision.
    pub fn check(&self) -> Admission {
        let rate = (self.rate)();
        let now = self.clock.now();
        // A poisoned bucket only means another thread panicked mid-update;
        // the f64 state inside is still usable.
        let mut bucket = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        bucket.try_acquire(now, rate)
    }

    /// The rate the limiter would apply if checked now.
    pub fn current_rate(&self) -> f64 {
        (self.rate)()
    }
}

impl fmt::Debug for DynamicRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicRateLimiter")
            .field("rate", &"<fn>")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

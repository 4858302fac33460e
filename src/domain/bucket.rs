//! Token bucket admission with a rate supplied per check.
//!
//! The bucket holds no configuration of its own. Each admission check is given
//! the rate in effect right now, so a rate change applies on the very next
//! check without rebuilding the bucket.

use std::time::Instant;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// One unit of work admitted
    Allow,
    /// Rate exhausted
    Deny,
}

impl Admission {
    /// Check if this decision is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, Admission::Allow)
    }

    /// Check if this decision is Deny.
    pub fn is_deny(&self) -> bool {
        matches!(self, Admission::Deny)
    }
}

/// Burst capacity for a rate: one second's worth of tokens, at least one.
pub fn burst_for(rate: f64) -> f64 {
    rate.ceil().max(1.0)
}

/// Token bucket whose refill rate is passed in on every check.
///
/// A fresh bucket starts full at the burst of the first rate it sees. A rate
/// that is zero, negative or not finite denies everything.
///
/// # Example
/// ```
/// use task_priority::domain::bucket::TokenBucket;
/// use std::time::{Duration, Instant};
///
/// let mut bucket = TokenBucket::new();
/// let now = Instant::now();
///
/// // Burst of 2 at 2 tokens/sec
/// assert!(bucket.try_acquire(now, 2.0).is_allow());
/// assert!(bucket.try_acquire(now, 2.0).is_allow());
/// assert!(bucket.try_acquire(now, 2.0).is_deny());
///
/// // Half a second later one token has been refilled
/// let later = now + Duration::from_millis(500);
/// assert!(bucket.try_acquire(later, 2.0).is_allow());
///
/// // Rate 0 denies regardless of stored tokens
/// assert!(bucket.try_acquire(later + Duration::from_secs(10), 0.0).is_deny());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Option<Instant>,
}

impl TokenBucket {
    /// Create an empty, unprimed bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take one token at `now` under `rate` tokens per second.
    pub fn try_acquire(&mut self, now: Instant, rate: f64) -> Admission {
        if !rate.is_finite() || rate <= 0.0 {
            // Nothing accrues while the domain is configured to zero.
            if let Some(last) = self.last_refill {
                self.last_refill = Some(last.max(now));
            }
            return Admission::Deny;
        }

        let burst = burst_for(rate);
        match self.last_refill {
            None => self.tokens = burst,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                self.tokens = (self.tokens + elapsed * rate).min(burst);
            }
        }
        self.last_refill = Some(self.last_refill.map_or(now, |last| last.max(now)));

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Admission::Allow
        } else {
            Admission::Deny
        }
    }

    /// Tokens currently held, without refilling.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

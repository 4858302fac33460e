//! In-process observability for priority assignment.
//!
//! Provides counters and latency totals that can be read back at any time,
//! plus a no-op sink for hosts that do not collect metrics.

use crate::application::ports::AssignerMetrics;
use crate::domain::priority::{PriorityClass, TaskPriority};
use crate::domain::task::QueueType;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Metrics tracking assignment statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    assigned_high: AtomicU64,
    assigned_default: AtomicU64,
    assigned_low: AtomicU64,
    transfer_throttled: AtomicU64,
    timer_throttled: AtomicU64,
    throttled_by_domain: DashMap<String, u64, RandomState>,
    assign_latency_nanos: AtomicU64,
    assign_count: AtomicU64,
    lookup_latency_nanos: AtomicU64,
    lookup_count: AtomicU64,
}

fn saturating_nanos(elapsed: Duration) -> u64 {
    elapsed.as_nanos().try_into().unwrap_or(u64::MAX)
}

impl InMemoryMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignments that ended in the given class.
    pub fn assigned(&self, class: PriorityClass) -> u64 {
        let counter = match class {
            PriorityClass::High => &self.inner.assigned_high,
            PriorityClass::Default => &self.inner.assigned_default,
            PriorityClass::Low => &self.inner.assigned_low,
        };
        counter.load(Ordering::Relaxed)
    }

    /// Throttle events for a queue type. Replication is never throttled.
    pub fn throttled(&self, queue_type: QueueType) -> u64 {
        match queue_type {
            QueueType::Transfer => self.inner.transfer_throttled.load(Ordering::Relaxed),
            QueueType::Timer => self.inner.timer_throttled.load(Ordering::Relaxed),
            QueueType::Replication => 0,
        }
    }

    /// Throttle events recorded for one domain, across queue types.
    pub fn throttled_for_domain(&self, domain_name: &str) -> u64 {
        self.inner
            .throttled_by_domain
            .get(domain_name)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Number of completed assignment calls, successful or not.
    pub fn assignments_timed(&self) -> u64 {
        self.inner.assign_count.load(Ordering::Relaxed)
    }

    /// Number of timed domain lookups.
    pub fn lookups_timed(&self) -> u64 {
        self.inner.lookup_count.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            assigned_high: self.assigned(PriorityClass::High),
            assigned_default: self.assigned(PriorityClass::Default),
            assigned_low: self.assigned(PriorityClass::Low),
            transfer_throttled: self.throttled(QueueType::Transfer),
            timer_throttled: self.throttled(QueueType::Timer),
            assign_count: self.assignments_timed(),
            assign_latency_total: Duration::from_nanos(
                self.inner.assign_latency_nanos.load(Ordering::Relaxed),
            ),
            lookup_count: self.lookups_timed(),
            lookup_latency_total: Duration::from_nanos(
                self.inner.lookup_latency_nanos.load(Ordering::Relaxed),
            ),
        }
    }
}

impl AssignerMetrics for InMemoryMetrics {
    fn record_assign_latency(&self, elapsed: Duration) {
        self.inner
            .assign_latency_nanos
            .fetch_add(saturating_nanos(elapsed), Ordering::Relaxed);
        self.inner.assign_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_domain_lookup_latency(&self, elapsed: Duration) {
        self.inner
            .lookup_latency_nanos
            .fetch_add(saturating_nanos(elapsed), Ordering::Relaxed);
        self.inner.lookup_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_throttled(&self, queue_type: QueueType, domain_name: &str) {
        match queue_type {
            QueueType::Transfer => {
                self.inner.transfer_throttled.fetch_add(1, Ordering::Relaxed);
            }
            QueueType::Timer => {
                self.inner.timer_throttled.fetch_add(1, Ordering::Relaxed);
            }
            QueueType::Replication => return,
        }
        *self
            .inner
            .throttled_by_domain
            .entry(domain_name.to_owned())
            .or_insert(0) += 1;
    }

    fn record_assigned(&self, priority: TaskPriority) {
        let counter = match priority.class() {
            PriorityClass::High => &self.inner.assigned_high,
            PriorityClass::Default => &self.inner.assigned_default,
            PriorityClass::Low => &self.inner.assigned_low,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Assignments at (High, _)
    pub assigned_high: u64,
    /// Assignments at (Default, _)
    pub assigned_default: u64,
    /// Assignments at (Low, _)
    pub assigned_low: u64,
    /// Throttled transfer tasks
    pub transfer_throttled: u64,
    /// Throttled timer tasks
    pub timer_throttled: u64,
    /// Timed assignment calls
    pub assign_count: u64,
    /// Sum of assignment latencies
    pub assign_latency_total: Duration,
    /// Timed domain lookups
    pub lookup_count: u64,
    /// Sum of domain lookup latencies
    pub lookup_latency_total: Duration,
}

impl MetricsSnapshot {
    /// Total successful assignments.
    pub fn total_assigned(&self) -> u64 {
        self.assigned_high
            .saturating_add(self.assigned_default)
            .saturating_add(self.assigned_low)
    }

    /// Fraction of successful assignments that were throttled (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been assigned.
    pub fn throttle_rate(&self) -> f64 {
        let total = self.total_assigned();
        if total == 0 {
            0.0
        } else {
            self.transfer_throttled.saturating_add(self.timer_throttled) as f64 / total as f64
        }
    }

    /// Mean assignment latency, or zero if nothing was timed.
    pub fn mean_assign_latency(&self) -> Duration {
        if self.assign_count == 0 {
            Duration::ZERO
        } else {
            self.assign_latency_total / self.assign_count.min(u32::MAX as u64) as u32
        }
    }
}

/// Metrics sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl AssignerMetrics for NoopMetrics {
    fn record_assign_latency(&self, _elapsed: Duration) {}

    fn record_domain_lookup_latency(&self, _elapsed: Duration) {}

    fn record_throttled(&self, _queue_type: QueueType, _domain_name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = InMemoryMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_assigned(), 0);
        assert_eq!(snapshot.transfer_throttled, 0);
        assert_eq!(snapshot.timer_throttled, 0);
        assert_eq!(snapshot.throttle_rate(), 0.0);
        assert_eq!(snapshot.mean_assign_latency(), Duration::ZERO);
    }

    #[test]
    fn test_record_throttled_by_queue_type() {
        let metrics = InMemoryMetrics::new();
        metrics.record_throttled(QueueType::Transfer, "d1");
        metrics.record_throttled(QueueType::Transfer, "d1");
        metrics.record_throttled(QueueType::Timer, "d2");

        assert_eq!(metrics.throttled(QueueType::Transfer), 2);
        assert_eq!(metrics.throttled(QueueType::Timer), 1);
        assert_eq!(metrics.throttled_for_domain("d1"), 2);
        assert_eq!(metrics.throttled_for_domain("d2"), 1);
        assert_eq!(metrics.throttled_for_domain("d3"), 0);
    }

    #[test]
    fn test_replication_never_counted_as_throttled() {
        let metrics = InMemoryMetrics::new();
        metrics.record_throttled(QueueType::Replication, "d1");

        assert_eq!(metrics.throttled(QueueType::Replication), 0);
        assert_eq!(metrics.throttled_for_domain("d1"), 0);
    }

    #[test]
    fn test_record_assigned() {
        let metrics = InMemoryMetrics::new();
        metrics.record_assigned(TaskPriority::HIGH);
        metrics.record_assigned(TaskPriority::HIGH);
        metrics.record_assigned(TaskPriority::DEFAULT);
        metrics.record_assigned(TaskPriority::LOW);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.assigned_high, 2);
        assert_eq!(snapshot.assigned_default, 1);
        assert_eq!(snapshot.assigned_low, 1);
        assert_eq!(snapshot.total_assigned(), 4);
    }

    #[test]
    fn test_throttle_rate() {
        let metrics = InMemoryMetrics::new();
        metrics.record_assigned(TaskPriority::HIGH);
        metrics.record_assigned(TaskPriority::DEFAULT);
        metrics.record_throttled(QueueType::Timer, "d1");

        assert!((metrics.snapshot().throttle_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latency_totals() {
        let metrics = InMemoryMetrics::new();
        metrics.record_assign_latency(Duration::from_micros(10));
        metrics.record_assign_latency(Duration::from_micros(30));
        metrics.record_domain_lookup_latency(Duration::from_micros(5));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.assign_count, 2);
        assert_eq!(snapshot.assign_latency_total, Duration::from_micros(40));
        assert_eq!(snapshot.mean_assign_latency(), Duration::from_micros(20));
        assert_eq!(snapshot.lookup_count, 1);
        assert_eq!(snapshot.lookup_latency_total, Duration::from_micros(5));
    }

    #[test]
    fn test_metrics_clone_shares_counters() {
        let metrics1 = InMemoryMetrics::new();
        metrics1.record_assigned(TaskPriority::HIGH);

        let metrics2 = metrics1.clone();
        metrics2.record_assigned(TaskPriority::HIGH);

        assert_eq!(metrics1.assigned(PriorityClass::High), 2);
        assert_eq!(metrics2.assigned(PriorityClass::High), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = InMemoryMetrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_assigned(TaskPriority::DEFAULT);
                    m.record_throttled(QueueType::Transfer, "shared");
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.assigned(PriorityClass::Default), 1000);
        assert_eq!(metrics.throttled(QueueType::Transfer), 1000);
        assert_eq!(metrics.throttled_for_domain("shared"), 1000);
    }
}

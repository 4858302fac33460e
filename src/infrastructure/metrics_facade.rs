//! Adapter forwarding assigner metrics to the `metrics` facade.
//!
//! Whatever recorder the host installs (Prometheus exporter, statsd, ...)
//! receives the series below. Without a recorder the calls are no-ops.
//!
//! | Series                                          | Kind      | Labels   |
//! |-------------------------------------------------|-----------|----------|
//! | `task_priority_assignment_latency_seconds`      | histogram |          |
//! | `task_priority_domain_lookup_latency_seconds`   | histogram |          |
//! | `task_priority_transfer_throttled_total`        | counter   | `domain` |
//! | `task_priority_timer_throttled_total`           | counter   | `domain` |
//! | `task_priority_assigned_total`                  | counter   | `class`  |

use crate::application::ports::AssignerMetrics;
use crate::domain::priority::TaskPriority;
use crate::domain::task::QueueType;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

pub const ASSIGNMENT_LATENCY: &str = "task_priority_assignment_latency_seconds";
pub const DOMAIN_LOOKUP_LATENCY: &str = "task_priority_domain_lookup_latency_seconds";
pub const TRANSFER_THROTTLED: &str = "task_priority_transfer_throttled_total";
pub const TIMER_THROTTLED: &str = "task_priority_timer_throttled_total";
pub const ASSIGNED: &str = "task_priority_assigned_total";

/// [`AssignerMetrics`] implementation backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacade;

impl MetricsFacade {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }

    /// Register descriptions for every series with the installed recorder.
    pub fn describe() {
        describe_histogram!(
            ASSIGNMENT_LATENCY,
            Unit::Seconds,
            "Time spent assigning a priority to one task"
        );
        describe_histogram!(
            DOMAIN_LOOKUP_LATENCY,
            Unit::Seconds,
            "Time spent resolving the owning domain of a task"
        );
        describe_counter!(
            TRANSFER_THROTTLED,
            Unit::Count,
            "Transfer tasks demoted because their domain exceeded its rate"
        );
        describe_counter!(
            TIMER_THROTTLED,
            Unit::Count,
            "Timer tasks demoted because their domain exceeded its rate"
        );
        describe_counter!(ASSIGNED, Unit::Count, "Priorities assigned, by class");
    }
}

impl AssignerMetrics for MetricsFacade {
    fn record_assign_latency(&self, elapsed: Duration) {
        histogram!(ASSIGNMENT_LATENCY).record(elapsed.as_secs_f64());
    }

    fn record_domain_lookup_latency(&self, elapsed: Duration) {
        histogram!(DOMAIN_LOOKUP_LATENCY).record(elapsed.as_secs_f64());
    }

    fn record_throttled(&self, queue_type: QueueType, domain_name: &str) {
        let name = match queue_type {
            QueueType::Transfer => TRANSFER_THROTTLED,
            QueueType::Timer => TIMER_THROTTLED,
            QueueType::Replication => return,
        };
        counter!(name, "domain" => domain_name.to_owned()).increment(1);
    }

    fn record_assigned(&self, priority: TaskPriority) {
        counter!(ASSIGNED, "class" => priority.class().as_str()).increment(1);
    }
}

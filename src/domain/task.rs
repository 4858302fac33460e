//! Tasks as seen by the priority assigner.
//!
//! The assigner never owns tasks. It reads the queue type and the owning
//! domain, then writes a priority back.

use crate::domain::priority::TaskPriority;
use std::fmt;

/// Subsystem that produced a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Transfer queue (cross-service task transfer)
    Transfer,
    /// Durable timer queue
    Timer,
    /// Cross-cluster replication queue
    Replication,
}

impl QueueType {
    /// Lowercase label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Transfer => "transfer",
            QueueType::Timer => "timer",
            QueueType::Replication => "replication",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work that can receive a priority.
pub trait Task {
    /// Queue the task was produced by.
    fn queue_type(&self) -> QueueType;

    /// Identifier of the domain owning the task.
    fn domain_id(&self) -> &str;

    /// Overwrite the task's priority.
    fn set_priority(&mut self, priority: TaskPriority);
}

/// Minimal owned task for callers without their own task type.
///
/// # Example
/// ```
/// use task_priority::{QueueType, QueuedTask, Task, TaskPriority};
///
/// let mut task = QueuedTask::new(QueueType::Timer, "domain-1");
/// assert_eq!(task.priority(), None);
///
/// task.set_priority(TaskPriority::HIGH);
/// assert_eq!(task.priority(), Some(TaskPriority::HIGH));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    queue_type: QueueType,
    domain_id: String,
    priority: Option<TaskPriority>,
}

impl QueuedTask {
    /// Create a task with no priority assigned yet.
    pub fn new(queue_type: QueueType, domain_id: impl Into<String>) -> Self {
        Self {
            queue_type,
            domain_id: domain_id.into(),
            priority: None,
        }
    }

    /// The last assigned priority, if any.
    pub fn priority(&self) -> Option<TaskPriority> {
        self.priority
    }
}

impl Task for QueuedTask {
    fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    fn domain_id(&self) -> &str {
        &self.domain_id
    }

    fn set_priority(&mut self, priority: TaskPriority) {
        self.priority = Some(priority);
    }
}

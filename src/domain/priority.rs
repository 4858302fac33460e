//! Task priority encoding.
//!
//! A priority is an ordered pair of a coarse class and a finer subclass,
//! packed into a single `u8` so downstream schedulers can order tasks by
//! comparing one scalar. Each level takes three bits; a larger value is more
//! urgent.

use std::fmt;

/// Number of bits reserved for each priority level.
const BITS_PER_LEVEL: u8 = 3;
const LEVEL_MASK: u8 = (1 << BITS_PER_LEVEL) - 1;

/// Coarse priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityClass {
    /// Work for domains not owned by this cluster, and replication work
    Low,
    /// Throttled work
    Default,
    /// Work admitted at full rate
    High,
}

/// Fine priority subclass within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrioritySubclass {
    Low,
    Default,
    High,
}

impl PriorityClass {
    const fn rank(self) -> u8 {
        match self {
            PriorityClass::Low => 0,
            PriorityClass::Default => 1,
            PriorityClass::High => 2,
        }
    }

    const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(PriorityClass::Low),
            1 => Some(PriorityClass::Default),
            2 => Some(PriorityClass::High),
            _ => None,
        }
    }

    /// Lowercase label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::Low => "low",
            PriorityClass::Default => "default",
            PriorityClass::High => "high",
        }
    }
}

impl PrioritySubclass {
    const fn rank(self) -> u8 {
        match self {
            PrioritySubclass::Low => 0,
            PrioritySubclass::Default => 1,
            PrioritySubclass::High => 2,
        }
    }

    const fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(PrioritySubclass::Low),
            1 => Some(PrioritySubclass::Default),
            2 => Some(PrioritySubclass::High),
            _ => None,
        }
    }

    /// Lowercase label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrioritySubclass::Low => "low",
            PrioritySubclass::Default => "default",
            PrioritySubclass::High => "high",
        }
    }
}

/// Error returned when decoding a scalar that is not a valid priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid task priority encoding: {0:#04x}")]
pub struct InvalidPriority(pub u8);

/// Encoded task priority.
///
/// Ordering follows the encoded scalar: every `High` class priority compares
/// greater than every `Default` class priority, which in turn compares greater
/// than every `Low` class priority, whatever the subclasses are.
///
/// # Example
/// ```
/// use task_priority::{PriorityClass, PrioritySubclass, TaskPriority};
///
/// let high = TaskPriority::new(PriorityClass::High, PrioritySubclass::Low);
/// let default = TaskPriority::new(PriorityClass::Default, PrioritySubclass::High);
/// assert!(high > default);
/// assert_eq!(TaskPriority::try_from(high.value()), Ok(high));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskPriority(u8);

impl TaskPriority {
    /// (Low, Default): replication work and domains active elsewhere.
    pub const LOW: TaskPriority = TaskPriority::new(PriorityClass::Low, PrioritySubclass::Default);
    /// (Default, Default): throttled work.
    pub const DEFAULT: TaskPriority =
        TaskPriority::new(PriorityClass::Default, PrioritySubclass::Default);
    /// (High, Default): admitted work.
    pub const HIGH: TaskPriority =
        TaskPriority::new(PriorityClass::High, PrioritySubclass::Default);

    /// Encode a (class, subclass) pair.
    pub const fn new(class: PriorityClass, subclass: PrioritySubclass) -> Self {
        TaskPriority((class.rank() << BITS_PER_LEVEL) | subclass.rank())
    }

    /// The coarse class.
    pub fn class(&self) -> PriorityClass {
        // Constructed values always hold a valid rank.
        PriorityClass::from_rank(self.0 >> BITS_PER_LEVEL).unwrap_or(PriorityClass::Low)
    }

    /// The fine subclass.
    pub fn subclass(&self) -> PrioritySubclass {
        PrioritySubclass::from_rank(self.0 & LEVEL_MASK).unwrap_or(PrioritySubclass::Low)
    }

    /// The raw scalar.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for TaskPriority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let class = PriorityClass::from_rank(value >> BITS_PER_LEVEL);
        let subclass = PrioritySubclass::from_rank(value & LEVEL_MASK);
        match (class, subclass) {
            (Some(class), Some(subclass)) => Ok(TaskPriority::new(class, subclass)),
            _ => Err(InvalidPriority(value)),
        }
    }
}

impl From<TaskPriority> for u8 {
    fn from(priority: TaskPriority) -> Self {
        priority.0
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class().as_str(), self.subclass().as_str())
    }
}

//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts of priority assignment:
//! - Priority encoding and ordering
//! - Tasks and queue types
//! - Domain replication snapshots
//! - Token bucket admission
//!
//! All types in this layer are pure and easily testable.

pub mod bucket;
pub mod priority;
pub mod snapshot;
pub mod task;

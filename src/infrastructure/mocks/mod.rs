//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of the assigner.

pub mod clock;
pub mod layer;
pub mod resolver;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use resolver::MockDomainResolver;

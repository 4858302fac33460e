//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic at runtime:
//! - Priority assigner (the per-task decision)
//! - Limiter registry (one limiter per domain name)
//! - Dynamic rate limiter (token bucket with a live rate)
//! - In-memory metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod assigner;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;

//! Shared Test Utilities for Tether
//!
//! Fixtures for driving connections over in-memory pipes and observing
//! exactly what reaches the outbound sink.

pub mod fixtures;

// Re-export the main types for convenience
pub use fixtures::{ConnectedPair, RecordingWriter, WriteLog, init_tracing};

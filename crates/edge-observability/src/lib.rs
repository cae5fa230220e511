//! Observability for the changelog service.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `LogBuilder` - Fluent construction of entries with typed fields
//! - `LogSink` - Forward to `tracing` or capture in memory

mod logging;

pub use logging::*;

// Re-export RequestId and TimingContext from edge-core for convenience
pub use edge_core::{RequestId, TimingContext};

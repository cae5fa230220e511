//! Core abstractions for the edge changelog endpoint.
//!
//! This crate provides the fundamental types shared by the cache and
//! rendering layers:
//! - `ChangelogConfig` - Service configuration (TOML or JSON)
//! - `RequestContext` - Typed request data (headers, validator, viewer)
//! - `TimingContext` - Request lifecycle timing

mod config;
mod context;
mod lifecycle;

pub use config::*;
pub use context::*;
pub use lifecycle::*;

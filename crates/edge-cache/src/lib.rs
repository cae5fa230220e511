//! Render cache and conditional-response layer for the edge changelog endpoint.
//!
//! This crate provides:
//! - `CacheKey` / `RenderKeyBuilder` - Deterministic render cache keys
//! - `RenderStore` - Key to blob store (in-memory, filesystem, Spin KV)
//! - `ResponseCachePolicy` - Cache-Control / Expires policy per response
//! - `Fingerprint` / `ConditionalGate` - ETag computation and 304 handling
//! - `ResponseHeadersBuilder` - Response header assembly
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{ConditionalGate, Fingerprint, GateDecision, RenderKeyBuilder};
//!
//! let fingerprint = Fingerprint::compute(raw.as_bytes(), Some("2.3.1"), modified);
//! if ConditionalGate::check(&fingerprint, ctx.if_none_match()) == GateDecision::NotModified {
//!     // 304, nothing else to do
//! }
//!
//! let key = RenderKeyBuilder::new("changelog", "1.0.0").build("42", Some("2.3.1"));
//! ```

mod conditional;
mod headers;
mod key;
mod policy;
mod store;

pub use conditional::*;
pub use headers::*;
pub use key::*;
pub use policy::*;
pub use store::*;

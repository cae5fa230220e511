//! Changelog pages for products.
//!
//! This crate turns one monolithic, loosely structured HTML changelog into
//! versioned entries and serves the rendered page under HTTP caching rules:
//! - `Normalizer` - Repairs mis-transcoded symbols before parsing
//! - `EntrySplitter` / `HeadingSplitter` - Splits HTML into `ChangelogEntry` values
//! - `extract_version` / `extract_date` - Heading field extraction
//! - `Renderer` / `HtmlTemplate` - Page rendering
//! - `ChangelogService` - Conditional gate, render cache and invalidation
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::InMemoryStore;
//! use edge_changelog::{ChangelogService, InMemoryCatalog};
//! use edge_core::{ChangelogConfig, RequestContext};
//!
//! let service = ChangelogService::new(ChangelogConfig::default(), InMemoryStore::new(), catalog);
//! let response = service.handle(&RequestContext::get("/downloads/demo/changelog/"), "demo");
//! ```

mod encoding;
mod entry;
mod error;
mod fields;
mod render;
mod response;
mod service;
mod source;
mod splitter;

pub use encoding::*;
pub use entry::*;
pub use error::*;
pub use fields::*;
pub use render::*;
pub use response::*;
pub use service::*;
pub use source::*;
pub use splitter::*;

//! Print the fingerprint and cache settings a changelog file is served with.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use edge_cache::{Fingerprint, RenderKeyBuilder, ResponseCachePolicy};
use serde_json::json;

use super::EtagArgs;
use crate::context::Context;

/// Run the etag command.
pub fn run(args: EtagArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.read_input(&args.file)?;
    let modified = match &args.modified {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Invalid --modified timestamp: {}", value))?
            .with_timezone(&Utc),
        None => ctx.input_modified(&args.file)?,
    };

    let version = args.version.as_deref();
    let fingerprint = Fingerprint::compute(&raw, version, modified);
    let key = RenderKeyBuilder::new(
        ctx.config.cache.key_prefix.as_str(),
        ctx.config.renderer_version.as_str(),
    )
    .build(&args.id, version);
    let policy = ResponseCachePolicy::for_version(version, &ctx.config.cache);

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "etag": fingerprint.etag(),
            "cache_key": key.as_str(),
            "cache_control": policy.cache_control_header(),
            "modified": modified.to_rfc3339(),
        }));
        return Ok(());
    }

    println!("{}", fingerprint.etag());
    if ctx.output.is_verbose() {
        ctx.output.kv("cache key", key.as_str());
        ctx.output.kv("cache-control", &policy.cache_control_header());
        ctx.output.kv("modified", &modified.to_rfc3339());
    }

    Ok(())
}

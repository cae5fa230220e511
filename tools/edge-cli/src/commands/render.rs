//! Render a changelog page through the service.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use edge_cache::{FsStore, InMemoryStore, RenderStore};
use edge_changelog::{is_canonical_slug, ChangelogService, InMemoryCatalog, Product};
use edge_core::RequestContext;
use serde::Serialize;

use super::RenderArgs;
use crate::context::Context;
use crate::output::{format_bytes, status_badge};

#[derive(Serialize)]
struct RenderReport<'a> {
    status: u16,
    cache_key: &'a str,
    cache_status: Option<String>,
    headers: &'a [(String, String)],
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Run the render command.
pub fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    if !is_canonical_slug(&args.slug) {
        ctx.output.warn(&format!(
            "Slug '{}' is not canonical; the request will be rejected",
            args.slug
        ));
    }

    let raw = ctx.read_input(&args.file)?;
    let modified = ctx.input_modified(&args.file)?;

    let mut product = Product::new(args.id.as_str(), &args.slug, &args.name, &args.url)
        .with_changelog(raw)
        .with_modified(modified);
    if let Some(version) = &args.version {
        product = product.with_version(version);
    }

    let catalog = InMemoryCatalog::new();
    catalog
        .insert(product.clone())
        .context("Failed to register product")?;

    let store: Arc<dyn RenderStore> = match &args.cache_dir {
        Some(dir) => {
            let dir = ctx.resolve_path(dir);
            ctx.output.debug(&format!("Caching renders in {}", dir.display()));
            Arc::new(
                FsStore::open(&dir)
                    .with_context(|| format!("Failed to open cache dir {}", dir.display()))?,
            )
        }
        None => Arc::new(InMemoryStore::new()),
    };

    let service = ChangelogService::new(ctx.config.clone(), store, catalog);
    let key = service.cache_key(&product);

    let mut request = RequestContext::get(format!("/{}/{}/", args.slug, ctx.config.endpoint_slug))
        .with_privileged(args.privileged);
    if let Some(validator) = &args.if_none_match {
        request = request.with_header("If-None-Match", validator);
    }
    if ctx.output.is_verbose() {
        request = request.with_header("X-Debug-Cache", "1");
    }

    let response = service.handle(&request, &args.slug);

    if let Some(path) = &args.output {
        let path = ctx.resolve_path(path);
        std::fs::write(&path, &response.body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        ctx.output.success(&format!(
            "Wrote {} to {}",
            format_bytes(response.body.len() as u64),
            path.display()
        ));
    }

    if ctx.output.is_json() {
        ctx.output.json(&RenderReport {
            status: response.status.as_u16(),
            cache_key: key.as_str(),
            cache_status: response.cache_status.map(|s| s.to_string()),
            headers: &response.headers,
            body: args.output.is_none().then_some(response.body.as_str()),
        });
    } else {
        ctx.output.header("Response");
        ctx.output.kv("status", &status_badge(response.status.as_u16()));
        ctx.output.kv("cache key", key.as_str());
        if let Some(status) = response.cache_status {
            ctx.output.kv("cache", &status.to_string());
        }
        for (name, value) in &response.headers {
            ctx.output.kv(name, value);
        }
        if args.output.is_none() {
            println!("\n{}", response.body);
        }
    }

    if response.status.is_client_error() || response.status.is_server_error() {
        anyhow::bail!("Request failed with status {}", response.status);
    }

    Ok(())
}

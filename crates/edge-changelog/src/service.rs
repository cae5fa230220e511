//! The changelog request pipeline.
//!
//! ```text
//! validate slug -> product lookup -> conditional gate -> cache lookup
//!     hit:  serve stored page
//!     miss: normalize -> filter -> split -> render -> store -> serve
//! ```
//!
//! The gate runs on a fingerprint of the raw source, so a matching validator
//! costs one product read and one hash. Store failures degrade to an
//! uncached render; only product lookup and render failures fail a request.

use edge_cache::{
    CacheKey, CacheStatus, ConditionalGate, Fingerprint, GateDecision, RenderKeyBuilder,
    RenderStore, ResponseCachePolicy, ResponseHeadersBuilder, HTML_CONTENT_TYPE,
};
use edge_core::{ChangelogConfig, LifecyclePhase, RequestContext, TimingContext};
use edge_observability::{LogSink, StructuredLogger, LOG_TARGET};

use crate::encoding::Normalizer;
use crate::entry::ChangelogEntry;
use crate::error::ChangelogError;
use crate::render::{ChangelogPage, HtmlTemplate, Renderer};
use crate::response::ChangelogResponse;
use crate::source::{MutationEvent, Product, ProductSource};
use crate::splitter::{EntrySplitter, HeadingSplitter};

/// Host hook applied to the normalized changelog before it is split.
pub type ContentFilter = Box<dyn Fn(&str, &Product) -> String>;

/// Whether a slug is non-empty and already in canonical form.
pub fn is_canonical_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_'))
}

/// Serves changelog pages for products.
pub struct ChangelogService<S, P> {
    config: ChangelogConfig,
    store: S,
    source: P,
    keys: RenderKeyBuilder,
    normalizer: Normalizer,
    splitter: Box<dyn EntrySplitter>,
    renderer: Box<dyn Renderer>,
    content_filter: Option<ContentFilter>,
    log_sink: LogSink,
}

impl<S: RenderStore, P: ProductSource> ChangelogService<S, P> {
    /// Create a service with the default splitter and template.
    pub fn new(config: ChangelogConfig, store: S, source: P) -> Self {
        Self {
            keys: RenderKeyBuilder::new(&config.cache.key_prefix, &config.renderer_version),
            normalizer: Normalizer::from_config(&config.encoding),
            splitter: Box::new(HeadingSplitter::new()),
            renderer: Box::new(HtmlTemplate::from_config(&config)),
            content_filter: None,
            log_sink: LogSink::default(),
            config,
            store,
            source,
        }
    }

    /// Replace the entry splitter.
    pub fn with_splitter(mut self, splitter: impl EntrySplitter + 'static) -> Self {
        self.splitter = Box::new(splitter);
        self
    }

    /// Replace the renderer.
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Install a content filter.
    pub fn with_content_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &Product) -> String + 'static,
    {
        self.content_filter = Some(Box::new(filter));
        self
    }

    /// Route request logs to a specific sink.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = sink;
        self
    }

    /// Service configuration.
    pub fn config(&self) -> &ChangelogConfig {
        &self.config
    }

    /// The render store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The product source.
    pub fn source(&self) -> &P {
        &self.source
    }

    /// Render cache key for a product's current state.
    pub fn cache_key(&self, product: &Product) -> CacheKey {
        self.keys
            .build(product.id.as_str(), product.version.as_deref())
    }

    /// Fingerprint of a product's current source.
    pub fn fingerprint(&self, product: &Product) -> Fingerprint {
        Fingerprint::compute(
            &product.raw_changelog,
            product.version.as_deref(),
            product.modified,
        )
    }

    /// Normalized and filtered changelog markup.
    pub fn prepare(&self, product: &Product) -> String {
        let normalized = self.normalizer.normalize(&product.raw_changelog);
        match &self.content_filter {
            Some(filter) => filter(&normalized, product),
            None => normalized,
        }
    }

    /// Parsed entries of a product's changelog.
    pub fn entries(&self, product: &Product) -> Vec<ChangelogEntry> {
        self.splitter.split(&self.prepare(product))
    }

    /// Render a product's page without touching the store.
    pub fn render_product(&self, product: &Product) -> Result<String, ChangelogError> {
        let log = self.logger(edge_core::RequestId::generate(), "render");
        self.render_page(product, &log)
    }

    /// Serve a changelog request. Errors become plain error pages.
    pub fn handle(&self, ctx: &RequestContext, slug: &str) -> ChangelogResponse {
        let log = self.request_logger(ctx);
        match self.serve(ctx, slug, &log) {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                let phase = LifecyclePhase::Error(e.to_string());
                if status.is_server_error() {
                    log.error_builder("changelog request failed")
                        .field("phase", phase.to_string())
                        .field("slug", slug)
                        .emit();
                } else {
                    log.info_builder("changelog not served")
                        .field("phase", phase.to_string())
                        .field("slug", slug)
                        .emit();
                }
                ChangelogResponse::error(status, error_page_message(&e))
            }
        }
    }

    /// Serve a changelog request, returning errors to the caller.
    pub fn try_handle(
        &self,
        ctx: &RequestContext,
        slug: &str,
    ) -> Result<ChangelogResponse, ChangelogError> {
        self.serve(ctx, slug, &self.request_logger(ctx))
    }

    /// Apply a product mutation to the render cache.
    ///
    /// Deletes the key for the product's current version and, when the event
    /// carries one, the key for the previous version. Returns the keys that
    /// were deleted.
    pub fn on_mutation(&self, event: &MutationEvent) -> Result<Vec<CacheKey>, ChangelogError> {
        if !event.field.affects_changelog() {
            return Ok(Vec::new());
        }

        let Some(product) = self.source.product(&event.product_id)? else {
            tracing::debug!(target: LOG_TARGET, product = %event.product_id, "mutation for unknown product");
            return Ok(Vec::new());
        };

        let mut keys = vec![self.cache_key(&product)];
        if let Some(previous) = &event.previous_version {
            let stale = self.keys.build(product.id.as_str(), Some(previous.as_str()));
            if !keys.contains(&stale) {
                keys.push(stale);
            }
        }

        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            match self.store.delete(key.as_str()) {
                Ok(()) => {
                    tracing::info!(target: LOG_TARGET, key = %key, field = ?event.field, "invalidated render cache");
                    deleted.push(key);
                }
                Err(e) => {
                    tracing::warn!(target: LOG_TARGET, key = %key, error = %e, "failed to invalidate render cache");
                }
            }
        }

        Ok(deleted)
    }

    fn serve(
        &self,
        ctx: &RequestContext,
        slug: &str,
        log: &StructuredLogger,
    ) -> Result<ChangelogResponse, ChangelogError> {
        let mut timing = ctx.timing.clone();

        if !is_canonical_slug(slug) {
            return Err(ChangelogError::InvalidSlug(slug.to_string()));
        }

        let product = self
            .source
            .product_by_slug(slug)?
            .filter(|p| p.published)
            .ok_or_else(|| ChangelogError::ProductNotFound(slug.to_string()))?;

        if !product.has_changelog() {
            return Err(ChangelogError::EmptyChangelog(slug.to_string()));
        }
        timing.mark("lookup");

        let now = ctx.received_at;
        let key = self.cache_key(&product);
        let debug = ctx.wants_debug_headers() || self.config.debug_headers;

        if ctx.privileged {
            let (body, status) = self.lookup_or_render(&product, &key, log)?;
            let mut headers = ResponseHeadersBuilder::new()
                .cache_policy(&ResponseCachePolicy::no_cache(), now)
                .content_type(HTML_CONTENT_TYPE);
            if debug {
                headers = headers.debug(status, &key);
            }
            self.log_served(log, ctx, &timing, status, &key);
            return Ok(ChangelogResponse::ok(headers.build(), body, status));
        }

        let fingerprint = self.fingerprint(&product);
        let policy = ResponseCachePolicy::for_version(product.version.as_deref(), &self.config.cache);
        let headers = ResponseHeadersBuilder::new()
            .frame_ancestors(&self.config.site_domain)
            .content_type(HTML_CONTENT_TYPE)
            .cache_policy(&policy, now)
            .etag(&fingerprint);

        if ConditionalGate::check(&fingerprint, ctx.if_none_match()) == GateDecision::NotModified {
            log.info_builder("changelog not modified")
                .field("phase", LifecyclePhase::NotModified.to_string())
                .field("etag", fingerprint.etag())
                .emit();
            return Ok(ChangelogResponse::not_modified(headers.build()));
        }

        let (body, status) = self.lookup_or_render(&product, &key, log)?;
        let headers = if debug {
            headers.debug(status, &key)
        } else {
            headers
        };

        self.log_served(log, ctx, &timing, status, &key);
        Ok(ChangelogResponse::ok(headers.build(), body, status))
    }

    fn lookup_or_render(
        &self,
        product: &Product,
        key: &CacheKey,
        log: &StructuredLogger,
    ) -> Result<(String, CacheStatus), ChangelogError> {
        let store_ok = match self.store.get(key.as_str()) {
            Ok(Some(blob)) => {
                log.debug_builder("render cache hit")
                    .field("key", key.as_str())
                    .field_u64("bytes", blob.len() as u64)
                    .emit();
                return Ok((blob, CacheStatus::Hit));
            }
            Ok(None) => true,
            Err(e) => {
                log.warn_builder("render store unavailable, serving uncached")
                    .field("key", key.as_str())
                    .field("error", e.to_string())
                    .emit();
                false
            }
        };

        let html = self.render_page(product, log)?;

        if !store_ok {
            return Ok((html, CacheStatus::Error));
        }

        if !html.is_empty() {
            match self.store.set(key.as_str(), &html) {
                Ok(()) => log
                    .debug_builder("stored rendered changelog")
                    .field("key", key.as_str())
                    .field_u64("bytes", html.len() as u64)
                    .emit(),
                Err(e) => log
                    .warn_builder("failed to store rendered changelog")
                    .field("key", key.as_str())
                    .field("error", e.to_string())
                    .emit(),
            }
        }

        Ok((html, CacheStatus::Miss))
    }

    fn render_page(
        &self,
        product: &Product,
        log: &StructuredLogger,
    ) -> Result<String, ChangelogError> {
        let changelog = self.prepare(product);
        if changelog.trim().is_empty() {
            return Err(ChangelogError::EmptyChangelog(product.slug.clone()));
        }
        let entries = self.splitter.split(&changelog);

        if entries.is_empty() {
            log.info_builder("no version headings found, rendering unstructured changelog")
                .field("product", product.id.as_str())
                .emit();
        }

        let page = ChangelogPage {
            product,
            changelog: &changelog,
            entries: &entries,
        };
        let html = self.renderer.render(&page).inspect_err(|e| {
            log.error_builder("changelog render failed")
                .field("product", product.id.as_str())
                .field("error", e.to_string())
                .emit();
        })?;
        Ok(html)
    }

    fn log_served(
        &self,
        log: &StructuredLogger,
        ctx: &RequestContext,
        timing: &TimingContext,
        status: CacheStatus,
        key: &CacheKey,
    ) {
        let phase = match status {
            CacheStatus::Hit => LifecyclePhase::CacheHit,
            CacheStatus::Miss | CacheStatus::Error => LifecyclePhase::Rendered,
        };
        let entry = log
            .info_builder("changelog served")
            .field("phase", phase.to_string())
            .field("cache_status", status.to_string())
            .field("key", key.as_str())
            .field("method", ctx.method.as_str())
            .field_bool("privileged", ctx.privileged)
            .duration_ms("duration_ms", timing.elapsed());
        let entry = match timing.since_start("lookup") {
            Some(lookup) => entry.duration_ms("lookup_ms", lookup),
            None => entry,
        };
        entry.emit();
    }

    fn request_logger(&self, ctx: &RequestContext) -> StructuredLogger {
        self.logger(ctx.request_id.clone(), &ctx.path)
    }

    fn logger(&self, request_id: edge_core::RequestId, route: &str) -> StructuredLogger {
        StructuredLogger::from_settings(request_id, &self.config.log)
            .with_route(route)
            .with_sink(self.log_sink.clone())
    }
}

fn error_page_message(error: &ChangelogError) -> &'static str {
    match error {
        ChangelogError::InvalidSlug(_) | ChangelogError::ProductNotFound(_) => "Download not found.",
        ChangelogError::EmptyChangelog(_) => "No changelog found for this download.",
        ChangelogError::Source(_) | ChangelogError::Render(_) => "The changelog could not be displayed.",
    }
}

//! Changelog page rendering.

use edge_core::ChangelogConfig;
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};

use crate::entry::ChangelogEntry;
use crate::fields::format_date_safely;
use crate::source::Product;

/// Rendering failure. Fatal for the request.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The template could not produce a page.
    #[error("template error: {0}")]
    Template(String),

    /// Structured data could not be serialized.
    #[error("failed to serialize structured data: {0}")]
    StructuredData(#[from] serde_json::Error),
}

/// Everything a renderer needs for one page.
#[derive(Debug, Clone, Copy)]
pub struct ChangelogPage<'a> {
    pub product: &'a Product,
    /// Normalized changelog, used as-is when no entries were parsed.
    pub changelog: &'a str,
    pub entries: &'a [ChangelogEntry],
}

impl ChangelogPage<'_> {
    /// Whether the page falls back to the unstructured changelog.
    pub fn is_fallback(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Clean author-supplied markup before it goes into a page.
///
/// Scripts, event-handler attributes and `javascript:` URLs are removed;
/// structural and formatting tags are kept, along with `class` and `id`.
pub fn sanitize_fragment(html: &str) -> String {
    let mut builder = ammonia::Builder::default();
    builder.add_generic_attributes(&["class", "id"]);
    builder.clean(html).to_string()
}

/// Produces the page body for a parsed changelog.
pub trait Renderer {
    /// Render the full HTML document.
    fn render(&self, page: &ChangelogPage<'_>) -> Result<String, RenderError>;
}

/// Head content for the page.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Meta tags as (attribute, key, content).
    pub meta: Vec<(&'static str, String, String)>,
    /// Link tags.
    pub links: Vec<String>,
    /// JSON-LD blocks.
    pub structured_data: Vec<String>,
}

impl HeadContent {
    /// Create new head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add a `<meta name=...>` tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push(("name", name.to_string(), content.to_string()));
        self
    }

    /// Add a `<meta property=...>` tag (Open Graph).
    pub fn with_property(mut self, property: &str, content: &str) -> Self {
        self.meta
            .push(("property", property.to_string(), content.to_string()));
        self
    }

    /// Add a link tag.
    pub fn with_link(mut self, rel: &str, href: &str, title: Option<&str>) -> Self {
        let mut link = format!(
            r#"<link rel="{}" href="{}""#,
            rel,
            encode_double_quoted_attribute(href)
        );
        if let Some(title) = title {
            link.push_str(&format!(r#" title="{}""#, encode_double_quoted_attribute(title)));
        }
        link.push('>');
        self.links.push(link);
        self
    }

    /// Add a JSON-LD block.
    pub fn with_structured_data(mut self, value: &serde_json::Value) -> Result<Self, RenderError> {
        let json = serde_json::to_string_pretty(value)?;
        self.structured_data.push(json.replace("</", "<\\/"));
        Ok(self)
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = String::new();

        html.push_str("<meta charset=\"UTF-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", encode_text(title)));
        }

        for (attr, key, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta {}="{}" content="{}">"#,
                attr,
                encode_double_quoted_attribute(key),
                encode_double_quoted_attribute(content)
            ));
            html.push('\n');
        }

        for link in &self.links {
            html.push_str(link);
            html.push('\n');
        }

        for json in &self.structured_data {
            html.push_str(&format!(
                "<script type=\"application/ld+json\">\n{}\n</script>\n",
                json
            ));
        }

        html
    }
}

/// Default HTML template with SEO metadata and h-entry microformats.
#[derive(Debug, Clone)]
pub struct HtmlTemplate {
    locale: String,
    endpoint_slug: String,
    stylesheet_url: Option<String>,
    renderer_version: String,
}

impl Default for HtmlTemplate {
    fn default() -> Self {
        Self::from_config(&ChangelogConfig::default())
    }
}

impl HtmlTemplate {
    /// Create a template from service configuration.
    pub fn from_config(config: &ChangelogConfig) -> Self {
        Self {
            locale: config.render.locale.clone(),
            endpoint_slug: config.endpoint_slug.clone(),
            stylesheet_url: config.render.stylesheet_url.clone(),
            renderer_version: config.renderer_version.clone(),
        }
    }

    /// Canonical URL of a product's changelog.
    pub fn changelog_url(&self, product: &Product) -> String {
        let base = product.url.trim_end_matches('/');
        format!("{}/{}/", base, self.endpoint_slug.trim_matches('/'))
    }

    fn head(&self, page: &ChangelogPage<'_>) -> Result<HeadContent, RenderError> {
        let product = page.product;
        let name = product.name.as_str();
        let title = format!("{} - Changelog", name);
        let changelog_url = self.changelog_url(product);
        let modified = product.modified.to_rfc3339();

        let mut head = HeadContent::new(&title)
            .with_meta("robots", "index, follow")
            .with_meta(
                "description",
                &format!(
                    "Changelog and release notes for {}. Stay updated with the latest features, improvements, and bug fixes.",
                    name
                ),
            )
            .with_meta(
                "keywords",
                &format!("{}, changelog, release notes, updates, version history", name),
            )
            .with_property("og:title", &title)
            .with_property("og:description", &format!("Changelog and release notes for {}", name))
            .with_property("og:type", "article")
            .with_property("og:url", &changelog_url)
            .with_property("article:modified_time", &modified);

        if let Some(image) = &product.featured_image {
            head = head
                .with_property("og:image", &image.url)
                .with_property("og:image:width", &image.width.to_string())
                .with_property("og:image:height", &image.height.to_string())
                .with_property("og:image:type", &image.mime_type);
            if !image.alt.is_empty() {
                head = head.with_property("og:image:alt", &image.alt);
            }
        }

        let twitter_card = if product.featured_image.is_some() {
            "summary_large_image"
        } else {
            "summary"
        };

        head = head
            .with_link("canonical", &changelog_url, None)
            .with_link("up", &product.url, Some(name))
            .with_meta("twitter:card", twitter_card)
            .with_meta("twitter:title", &title)
            .with_meta(
                "twitter:description",
                &format!("Latest updates and release notes for {}", name),
            );

        if let Some(image) = &product.featured_image {
            head = head.with_meta("twitter:image", &image.url);
        }

        let software_version = page
            .entries
            .first()
            .map(|e| e.version.as_str())
            .unwrap_or_default();
        head = head.with_structured_data(&serde_json::json!({
            "@context": "https://schema.org",
            "@type": "SoftwareApplication",
            "name": name,
            "url": product.url,
            "releaseNotes": changelog_url,
            "dateModified": modified,
            "applicationCategory": "DeveloperApplication",
            "softwareVersion": software_version,
        }))?;

        if let Some(stylesheet) = &self.stylesheet_url {
            let href = format!("{}?v={}", stylesheet, self.renderer_version);
            head = head.with_link("stylesheet", &href, None);
        }

        Ok(head)
    }

    fn render_entry(&self, entry: &ChangelogEntry, changelog_url: &str) -> String {
        let anchor = entry.anchor();
        let heading = decode_html_entities(&entry.raw_heading);
        let mut html = format!(
            "<article class=\"h-entry\" id=\"{}\">\n<header class=\"entry-header\">\n<h2 class=\"p-name\">{}</h2>\n",
            encode_double_quoted_attribute(&anchor),
            encode_text(&heading)
        );

        if let Some(date) = &entry.date {
            html.push_str(&format!(
                "<time class=\"dt-published\" datetime=\"{}\">{}</time>\n",
                encode_double_quoted_attribute(date),
                encode_text(&format_date_safely(Some(date)))
            ));
        }

        html.push_str("</header>\n");
        html.push_str(&format!(
            "<div class=\"e-content\">\n{}\n</div>\n",
            sanitize_fragment(&entry.content)
        ));
        html.push_str(&format!(
            "<a class=\"u-url\" href=\"{}#{}\">Version {} permalink</a>\n</article>\n",
            encode_double_quoted_attribute(changelog_url),
            encode_double_quoted_attribute(&anchor),
            encode_text(&entry.version)
        ));
        html
    }

    fn render_fallback(&self, page: &ChangelogPage<'_>, changelog_url: &str) -> String {
        let product = page.product;
        format!(
            "<article class=\"h-entry\">\n<h2 class=\"p-name\">{} Changelog</h2>\n\
             <div class=\"e-content\">\n{}\n</div>\n\
             <time class=\"dt-published\" datetime=\"{}\">{}</time>\n\
             <a class=\"u-url\" href=\"{}\">Changelog permalink</a>\n</article>\n",
            encode_text(&product.name),
            sanitize_fragment(page.changelog),
            encode_double_quoted_attribute(&product.modified.to_rfc3339()),
            product.modified.format("%B %-d, %Y"),
            encode_double_quoted_attribute(changelog_url)
        )
    }
}

impl Renderer for HtmlTemplate {
    fn render(&self, page: &ChangelogPage<'_>) -> Result<String, RenderError> {
        let product = page.product;
        let changelog_url = self.changelog_url(product);
        let head = self.head(page)?;

        let mut html = String::from("<!DOCTYPE html>\n");
        html.push_str(&format!(
            "<html lang=\"{}\" class=\"changelog-iframe\">\n<head>\n",
            encode_double_quoted_attribute(&self.locale)
        ));
        html.push_str(&head.render());
        html.push_str("</head>\n<body class=\"changelog-page\">\n<div class=\"changelog-container\">\n");

        html.push_str(&format!(
            "<header class=\"changelog-header\">\n<h1 class=\"changelog-title\">{} Changelog</h1>\n\
             <p class=\"changelog-subtitle\">Release notes and version history for \
             <a href=\"{}\" rel=\"up\">{}</a>.",
            encode_text(&product.name),
            encode_double_quoted_attribute(&product.url),
            encode_text(&product.name)
        ));
        if !product.excerpt.is_empty() {
            html.push(' ');
            html.push_str(&encode_text(&product.excerpt));
        }
        html.push_str("</p>\n</header>\n<main class=\"changelog-entries\">\n");

        if page.is_fallback() {
            html.push_str(&self.render_fallback(page, &changelog_url));
        } else {
            for entry in page.entries {
                html.push_str(&self.render_entry(entry, &changelog_url));
            }
        }

        html.push_str("</main>\n</div>\n</body>\n</html>\n");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FeaturedImage;
    use chrono::{TimeZone, Utc};

    fn product() -> Product {
        Product::new(3u64, "demo", "Demo & Co", "https://shop.test/downloads/demo/")
            .with_modified(Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap())
            .with_excerpt("A demo plugin.")
    }

    fn entry(version: &str, date: Option<&str>) -> ChangelogEntry {
        ChangelogEntry {
            version: version.to_string(),
            date: date.map(str::to_string),
            raw_heading: format!("{} on June 1, 2024", version),
            content: "<p>Fixed X</p>".to_string(),
        }
    }

    #[test]
    fn test_changelog_url() {
        let template = HtmlTemplate::default();
        assert_eq!(
            template.changelog_url(&product()),
            "https://shop.test/downloads/demo/changelog/"
        );
    }

    #[test]
    fn test_renders_entries_with_microformats() {
        let product = product();
        let entries = vec![
            entry("1.2.0", Some("2024-06-01T00:00:00+00:00")),
            entry("1.1.0", None),
        ];
        let html = HtmlTemplate::default()
            .render(&ChangelogPage {
                product: &product,
                changelog: "",
                entries: &entries,
            })
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<html lang=\"en-US\""));
        assert!(html.contains("<title>Demo &amp; Co - Changelog</title>"));
        assert!(html.contains("id=\"version-1.2.0\""));
        assert!(html.contains(
            "<time class=\"dt-published\" datetime=\"2024-06-01T00:00:00+00:00\">June 1, 2024</time>"
        ));
        assert_eq!(html.matches("dt-published").count(), 1);
        assert!(html.contains("<div class=\"e-content\">\n<p>Fixed X</p>\n</div>"));
        assert!(html.contains(
            "href=\"https://shop.test/downloads/demo/changelog/#version-1.1.0\">Version 1.1.0 permalink</a>"
        ));
        assert!(html.contains("\"softwareVersion\": \"1.2.0\""));
        assert!(html.contains("A demo plugin."));
        assert!(html.find("version-1.2.0") < html.find("version-1.1.0"));
    }

    #[test]
    fn test_fallback_renders_whole_changelog() {
        let product = product();
        let html = HtmlTemplate::default()
            .render(&ChangelogPage {
                product: &product,
                changelog: "<p>just text</p>",
                entries: &[],
            })
            .unwrap();

        assert!(html.contains("<h2 class=\"p-name\">Demo &amp; Co Changelog</h2>"));
        assert!(html.contains("<p>just text</p>"));
        assert!(html.contains("datetime=\"2024-06-02T10:00:00+00:00\">June 2, 2024</time>"));
        assert!(html.contains("\"softwareVersion\": \"\""));
    }

    #[test]
    fn test_head_metadata() {
        let product = product().with_featured_image(FeaturedImage {
            url: "https://shop.test/img.png".into(),
            width: 1200,
            height: 630,
            alt: "Logo".into(),
            mime_type: "image/png".into(),
        });
        let mut config = ChangelogConfig::default().with_renderer_version("2.1.0");
        config.render.stylesheet_url = Some("https://cdn.test/changelog.css".into());

        let html = HtmlTemplate::from_config(&config)
            .render(&ChangelogPage {
                product: &product,
                changelog: "",
                entries: &[entry("1.0", None)],
            })
            .unwrap();

        assert!(html.contains(
            "<link rel=\"canonical\" href=\"https://shop.test/downloads/demo/changelog/\">"
        ));
        assert!(html.contains(
            "<link rel=\"up\" href=\"https://shop.test/downloads/demo/\" title=\"Demo &amp; Co\">"
        ));
        assert!(html.contains("<meta property=\"og:image\" content=\"https://shop.test/img.png\">"));
        assert!(html.contains("<meta name=\"twitter:card\" content=\"summary_large_image\">"));
        assert!(html.contains("href=\"https://cdn.test/changelog.css?v=2.1.0\""));
        assert!(html.contains("\"@type\": \"SoftwareApplication\""));
    }

    #[test]
    fn test_heading_is_escaped_once() {
        let product = product();
        let mut e = entry("1.0", None);
        e.raw_heading = "1.0 &amp; <b>".to_string();
        let html = HtmlTemplate::default()
            .render(&ChangelogPage {
                product: &product,
                changelog: "",
                entries: &[e],
            })
            .unwrap();
        assert!(html.contains("<h2 class=\"p-name\">1.0 &amp; &lt;b&gt;</h2>"));
    }

    #[test]
    fn test_sanitize_fragment() {
        let clean = sanitize_fragment(
            "<h3 class=\"note\">Fixed</h3><p onclick=\"x()\">ok</p><script>alert(1)</script>\
             <a href=\"javascript:alert(2)\">link</a>",
        );
        assert!(clean.contains("<h3 class=\"note\">Fixed</h3>"));
        assert!(clean.contains("<p>ok</p>"));
        assert!(!clean.contains("script"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("javascript:"));
    }

    #[test]
    fn test_entry_and_fallback_content_are_sanitized() {
        let product = product();
        let mut e = entry("1.0", None);
        e.content = "<p>ok</p><img src=\"x\" onerror=\"alert(2)\">".to_string();
        let html = HtmlTemplate::default()
            .render(&ChangelogPage {
                product: &product,
                changelog: "",
                entries: &[e],
            })
            .unwrap();
        assert!(html.contains("<p>ok</p>"));
        assert!(!html.contains("onerror"));

        let html = HtmlTemplate::default()
            .render(&ChangelogPage {
                product: &product,
                changelog: "<p>text</p><script>alert(1)</script>",
                entries: &[],
            })
            .unwrap();
        assert!(html.contains("<p>text</p>"));
        assert!(!html.contains("alert(1)"));
    }

    #[test]
    fn test_structured_data_cannot_close_script() {
        let head = HeadContent::new("t")
            .with_structured_data(&serde_json::json!({ "name": "</script><script>" }))
            .unwrap();
        assert!(!head.render().contains("</script><script>"));
    }
}

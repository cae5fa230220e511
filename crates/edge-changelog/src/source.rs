//! Product data the changelog is rendered from.
//!
//! Products are owned by the host; the service only reads them. The
//! in-memory catalog doubles as the host in tests and the CLI, and reports
//! every change to a changelog-relevant field as a `MutationEvent`.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, stable product identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Create from any string identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image used for social previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub alt: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

/// A product with a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// URL slug the changelog is requested by.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Product page URL, with trailing slash.
    pub url: String,
    /// Short description shown under the page title.
    #[serde(default)]
    pub excerpt: String,
    /// Unpublished products are not served.
    #[serde(default = "default_published")]
    pub published: bool,
    /// Changelog exactly as stored, possibly mis-encoded.
    #[serde(default)]
    pub raw_changelog: Vec<u8>,
    /// Current product version, if any.
    #[serde(default)]
    pub version: Option<String>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub featured_image: Option<FeaturedImage>,
}

fn default_published() -> bool {
    true
}

impl Product {
    /// Create a published product with no changelog.
    pub fn new(
        id: impl Into<ProductId>,
        slug: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            url: url.into(),
            excerpt: String::new(),
            published: true,
            raw_changelog: Vec::new(),
            version: None,
            modified: Utc::now(),
            featured_image: None,
        }
    }

    /// Set the raw changelog.
    pub fn with_changelog(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.raw_changelog = raw.into();
        self
    }

    /// Set the current version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = modified;
        self
    }

    /// Set the excerpt.
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Set the featured image.
    pub fn with_featured_image(mut self, image: FeaturedImage) -> Self {
        self.featured_image = Some(image);
        self
    }

    /// Set the publication state.
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Whether there is any changelog text at all.
    pub fn has_changelog(&self) -> bool {
        !self.raw_changelog.iter().all(u8::is_ascii_whitespace)
    }
}

/// Error reading product data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("product source unavailable: {0}")]
    Unavailable(String),
}

/// Read access to products.
pub trait ProductSource {
    /// Look up a product by slug.
    fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, SourceError>;

    /// Look up a product by identity.
    fn product(&self, id: &ProductId) -> Result<Option<Product>, SourceError>;
}

/// Product field touched by a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    /// The current version string.
    Version,
    /// The raw changelog text.
    Changelog,
    /// Anything else; never affects the rendered changelog.
    Other(String),
}

impl ProductField {
    /// Whether a change to this field can change the rendered page.
    pub fn affects_changelog(&self) -> bool {
        matches!(self, Self::Version | Self::Changelog)
    }
}

/// Signal that a product field changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub product_id: ProductId,
    pub field: ProductField,
    /// Version before the change, when the version itself changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}

impl MutationEvent {
    /// Create an event for a field change.
    pub fn new(product_id: ProductId, field: ProductField) -> Self {
        Self {
            product_id,
            field,
            previous_version: None,
        }
    }

    /// Record the version in effect before the change.
    pub fn with_previous_version(mut self, version: Option<String>) -> Self {
        self.previous_version = version;
        self
    }
}

/// In-memory product catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product.
    pub fn insert(&self, product: Product) -> Result<(), SourceError> {
        let mut products = self
            .products
            .write()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        products.insert(product.id.clone(), product);
        Ok(())
    }

    /// Change a product's version. Returns the mutation to report, or `None`
    /// if the product does not exist.
    pub fn set_version(
        &self,
        id: &ProductId,
        version: Option<String>,
        modified: DateTime<Utc>,
    ) -> Result<Option<MutationEvent>, SourceError> {
        let mut products = self
            .products
            .write()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let Some(product) = products.get_mut(id) else {
            return Ok(None);
        };

        let previous = std::mem::replace(&mut product.version, version);
        product.modified = modified;
        Ok(Some(
            MutationEvent::new(id.clone(), ProductField::Version).with_previous_version(previous),
        ))
    }

    /// Replace a product's raw changelog. Returns the mutation to report, or
    /// `None` if the product does not exist.
    pub fn set_changelog(
        &self,
        id: &ProductId,
        raw: impl Into<Vec<u8>>,
        modified: DateTime<Utc>,
    ) -> Result<Option<MutationEvent>, SourceError> {
        let mut products = self
            .products
            .write()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let Some(product) = products.get_mut(id) else {
            return Ok(None);
        };

        product.raw_changelog = raw.into();
        product.modified = modified;
        Ok(Some(MutationEvent::new(id.clone(), ProductField::Changelog)))
    }
}

impl ProductSource for InMemoryCatalog {
    fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, SourceError> {
        let products = self
            .products
            .read()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(products.values().find(|p| p.slug == slug).cloned())
    }

    fn product(&self, id: &ProductId) -> Result<Option<Product>, SourceError> {
        let products = self
            .products
            .read()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(products.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(
                Product::new(7u64, "demo", "Demo", "https://shop.test/downloads/demo/")
                    .with_changelog("<h4>1.0</h4><p>a</p>")
                    .with_version("1.0"),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog();
        let by_slug = catalog.product_by_slug("demo").unwrap().unwrap();
        assert_eq!(by_slug.id, ProductId::from(7u64));
        assert!(catalog.product_by_slug("other").unwrap().is_none());
        assert!(catalog.product(&ProductId::from("7")).unwrap().is_some());
    }

    #[test]
    fn test_set_version_reports_previous() {
        let catalog = catalog();
        let event = catalog
            .set_version(&ProductId::from(7u64), Some("1.1".into()), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(event.field, ProductField::Version);
        assert_eq!(event.previous_version.as_deref(), Some("1.0"));

        let product = catalog.product(&ProductId::from(7u64)).unwrap().unwrap();
        assert_eq!(product.version.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_set_changelog_event() {
        let catalog = catalog();
        let event = catalog
            .set_changelog(&ProductId::from(7u64), "<h4>1.1</h4>", Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(event.field, ProductField::Changelog);
        assert!(event.previous_version.is_none());
        assert!(catalog
            .set_changelog(&ProductId::from(8u64), "", Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_affects_changelog() {
        assert!(ProductField::Version.affects_changelog());
        assert!(ProductField::Changelog.affects_changelog());
        assert!(!ProductField::Other("price".into()).affects_changelog());
    }

    #[test]
    fn test_has_changelog() {
        let product = Product::new(1u64, "p", "P", "https://x.test/p/");
        assert!(!product.has_changelog());
        assert!(!product.clone().with_changelog("  \n").has_changelog());
        assert!(product.with_changelog("<p>x</p>").has_changelog());
    }
}

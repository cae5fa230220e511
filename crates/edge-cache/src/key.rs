//! Render cache key composition.
//!
//! Keys are plain strings built from the product identity, the product's
//! current version and the renderer version. No content hash is involved:
//! the version field is expected to change whenever the changelog does, and
//! explicit invalidation covers edits that skip a version bump.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Placeholder used in keys when a product has no version.
pub const NO_VERSION: &str = "none";

/// Default prefix for render cache keys.
pub const DEFAULT_KEY_PREFIX: &str = "changelog";

/// A cache key uniquely identifying a stored render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// The computed key string.
    key: String,
    /// Components that make up the key (for debugging).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            components: Vec::new(),
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the key components (for debugging).
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Treat a blank version the same as a missing one. Any other version is
/// returned exactly as stored.
pub fn known_version(version: Option<&str>) -> Option<&str> {
    version.filter(|v| !v.trim().is_empty())
}

/// Builder for render cache keys.
#[derive(Debug, Clone)]
pub struct RenderKeyBuilder {
    prefix: String,
    renderer_version: String,
}

impl RenderKeyBuilder {
    /// Create a builder with a key prefix and the renderer version.
    pub fn new(prefix: impl Into<String>, renderer_version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            renderer_version: renderer_version.into(),
        }
    }

    /// Get the renderer version baked into every key.
    pub fn renderer_version(&self) -> &str {
        &self.renderer_version
    }

    /// Build the key for a product at a given version.
    pub fn build(&self, product_id: &str, version: Option<&str>) -> CacheKey {
        let version = known_version(version).unwrap_or(NO_VERSION);

        let parts = [
            escape_component(&self.prefix),
            escape_component(product_id),
            escape_component(version),
            escape_component(&self.renderer_version),
        ];

        CacheKey {
            key: parts.join(":"),
            components: vec![
                format!("product:{}", product_id),
                format!("version:{}", version),
                format!("renderer:{}", self.renderer_version),
            ],
        }
    }
}

/// Build a render cache key with the default prefix.
pub fn cache_key(product_id: &str, version: Option<&str>, renderer_version: &str) -> CacheKey {
    RenderKeyBuilder::new(DEFAULT_KEY_PREFIX, renderer_version).build(product_id, version)
}

// Components are joined with ':', so the separator and the escape
// character itself must not appear raw inside a component.
fn escape_component(part: &str) -> Cow<'_, str> {
    if !part.contains(|c| c == ':' || c == '%') {
        return Cow::Borrowed(part);
    }
    Cow::Owned(part.replace('%', "%25").replace(':', "%3A"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let key = cache_key("42", Some("2.3.1"), "1.0.0");
        assert_eq!(key.as_str(), "changelog:42:2.3.1:1.0.0");
        assert_eq!(key.components().len(), 3);
    }

    #[test]
    fn test_missing_version_uses_placeholder() {
        assert_eq!(cache_key("42", None, "1.0.0").as_str(), "changelog:42:none:1.0.0");
        assert_eq!(
            cache_key("42", Some("  "), "1.0.0"),
            cache_key("42", None, "1.0.0")
        );
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = cache_key("7", Some("1.0"), "1.0.0");
        let b = cache_key("7", Some("1.0"), "1.0.0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_version_bump_changes_key() {
        let before = cache_key("7", Some("1.0"), "1.0.0");
        let after = cache_key("7", Some("1.1"), "1.0.0");
        assert_ne!(before, after);
    }

    #[test]
    fn test_whitespace_in_version_changes_key() {
        assert_ne!(
            cache_key("7", Some(" 1.0"), "1.0.0"),
            cache_key("7", Some("1.0"), "1.0.0")
        );
    }

    #[test]
    fn test_renderer_version_changes_key() {
        let a = cache_key("7", Some("1.0"), "1.0.0");
        let b = cache_key("7", Some("1.0"), "1.0.1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_in_component_cannot_collide() {
        let a = cache_key("1:2", Some("3"), "rv");
        let b = cache_key("1", Some("2:3"), "rv");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "changelog:1%3A2:3:rv");
    }

    #[test]
    fn test_custom_prefix() {
        let builder = RenderKeyBuilder::new("edd", "2.0.0");
        assert_eq!(builder.build("9", Some("4.1")).as_str(), "edd:9:4.1:2.0.0");
        assert_eq!(builder.renderer_version(), "2.0.0");
    }

    #[test]
    fn test_known_version() {
        assert_eq!(known_version(Some(" 1.2 ")), Some(" 1.2 "));
        assert_eq!(known_version(Some(" \t")), None);
        assert_eq!(known_version(Some("")), None);
        assert_eq!(known_version(None), None);
    }
}

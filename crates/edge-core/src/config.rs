//! Changelog service configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for the changelog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogConfig {
    /// Renderer version. Part of every cache key, so bumping it orphans
    /// every stored render.
    #[serde(default = "default_renderer_version")]
    pub renderer_version: String,

    /// Site domain used in the `frame-ancestors` policy.
    #[serde(default = "default_site_domain")]
    pub site_domain: String,

    /// URL segment the changelog lives under (`<product-url>/<slug>/`).
    #[serde(default = "default_endpoint_slug")]
    pub endpoint_slug: String,

    /// Always attach `X-Cache-*` debug headers.
    #[serde(default)]
    pub debug_headers: bool,

    /// Render cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Encoding repair settings.
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Page rendering settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogSettings,
}

fn default_renderer_version() -> String {
    "1.0.0".to_string()
}

fn default_site_domain() -> String {
    "localhost".to_string()
}

fn default_endpoint_slug() -> String {
    "changelog".to_string()
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            renderer_version: default_renderer_version(),
            site_domain: default_site_domain(),
            endpoint_slug: default_endpoint_slug(),
            debug_headers: false,
            cache: CacheConfig::default(),
            encoding: EncodingConfig::default(),
            render: RenderConfig::default(),
            log: LogSettings::default(),
        }
    }
}

impl ChangelogConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let config: Self = if display.ends_with(".json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display,
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Check invariants the rest of the service relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.renderer_version.trim().is_empty() {
            return Err(ConfigError::Invalid("renderer_version must not be empty".into()));
        }
        if self.cache.key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.key_prefix must not be empty".into()));
        }
        if self.cache.versioned_max_age_secs == 0 || self.cache.fallback_max_age_secs == 0 {
            return Err(ConfigError::Invalid("cache max ages must be positive".into()));
        }
        Ok(())
    }

    /// Set the renderer version.
    pub fn with_renderer_version(mut self, version: impl Into<String>) -> Self {
        self.renderer_version = version.into();
        self
    }

    /// Set the site domain.
    pub fn with_site_domain(mut self, domain: impl Into<String>) -> Self {
        self.site_domain = domain.into();
        self
    }
}

/// Render cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix of every render cache key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Browser/CDN max-age when the product version is known.
    #[serde(default = "default_versioned_max_age")]
    pub versioned_max_age_secs: u64,

    /// Browser/CDN max-age when no version is known.
    #[serde(default = "default_fallback_max_age")]
    pub fallback_max_age_secs: u64,
}

fn default_key_prefix() -> String {
    "changelog".to_string()
}

fn default_versioned_max_age() -> u64 {
    30 * 24 * 3600
}

fn default_fallback_max_age() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            versioned_max_age_secs: default_versioned_max_age(),
            fallback_max_age_secs: default_fallback_max_age(),
        }
    }
}

/// Encoding repair configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Undo whole-text double encoding after the table repairs.
    #[serde(default = "default_true")]
    pub repair_double_encoding: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            repair_double_encoding: true,
        }
    }
}

/// Page rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Value of the `<html lang>` attribute.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Optional stylesheet linked from the page head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheet_url: Option<String>,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            stylesheet_url: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Minimum level: trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or human.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ChangelogConfig::default();
        assert_eq!(config.renderer_version, "1.0.0");
        assert_eq!(config.cache.versioned_max_age_secs, 2_592_000);
        assert_eq!(config.cache.fallback_max_age_secs, 3600);
        assert!(config.encoding.repair_double_encoding);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_partial() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "renderer_version = \"2.1.0\"\nsite_domain = \"example.com\"\n\n[cache]\nfallback_max_age_secs = 60"
        )
        .unwrap();

        let config = ChangelogConfig::load(file.path()).unwrap();
        assert_eq!(config.renderer_version, "2.1.0");
        assert_eq!(config.site_domain, "example.com");
        assert_eq!(config.cache.fallback_max_age_secs, 60);
        assert_eq!(config.cache.key_prefix, "changelog");
        assert_eq!(config.render.locale, "en-US");
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"debug_headers": true, "log": {{"format": "human"}}}}"#).unwrap();

        let config = ChangelogConfig::load(file.path()).unwrap();
        assert!(config.debug_headers);
        assert_eq!(config.log.format, "human");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ChangelogConfig::load("/nonexistent/changelog.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "renderer_version = \"\"").unwrap();

        let err = ChangelogConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_zero_max_age() {
        let mut config = ChangelogConfig::default();
        config.cache.versioned_max_age_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ChangelogConfig::default().with_site_domain("gravity.test");
        let text = config.to_toml().unwrap();
        let parsed: ChangelogConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.site_domain, "gravity.test");
    }
}

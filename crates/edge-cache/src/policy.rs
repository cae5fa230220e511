//! Response cache policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use edge_core::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::key::known_version;

/// Cache scope determining who can cache the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Cacheable by CDN and browser (shared cache).
    Public,
    /// Cacheable by browser only (private cache).
    Private,
    /// Must be revalidated on every use.
    #[default]
    NoCache,
}

impl CacheScope {
    /// Get the Cache-Control directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::NoCache => "no-cache",
        }
    }
}

/// Cache policy attached to a changelog response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCachePolicy {
    /// Cache scope.
    pub scope: CacheScope,
    /// How long clients may reuse the response.
    pub max_age: Duration,
    /// Content never changes for this URL + validator.
    pub immutable: bool,
}

impl ResponseCachePolicy {
    /// Long-lived, immutable policy used when the product version is known.
    pub fn versioned(max_age: Duration) -> Self {
        Self {
            scope: CacheScope::Public,
            max_age,
            immutable: true,
        }
    }

    /// Short-lived policy used when no version is known.
    pub fn fallback(max_age: Duration) -> Self {
        Self {
            scope: CacheScope::Public,
            max_age,
            immutable: false,
        }
    }

    /// Policy for privileged viewers: always revalidate.
    pub fn no_cache() -> Self {
        Self {
            scope: CacheScope::NoCache,
            max_age: Duration::ZERO,
            immutable: false,
        }
    }

    /// Pick the policy for a product version.
    pub fn for_version(version: Option<&str>, config: &CacheConfig) -> Self {
        match known_version(version) {
            Some(_) => Self::versioned(Duration::from_secs(config.versioned_max_age_secs)),
            None => Self::fallback(Duration::from_secs(config.fallback_max_age_secs)),
        }
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        if self.scope == CacheScope::NoCache {
            return "no-cache, must-revalidate, max-age=0".to_string();
        }

        let mut parts = vec![
            self.scope.cache_control_directive().to_string(),
            format!("max-age={}", self.max_age.as_secs()),
        ];

        if self.immutable {
            parts.push("immutable".to_string());
        }

        parts.join(", ")
    }

    /// Expiry timestamp for the `Expires` header, if the policy has one.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.scope == CacheScope::NoCache {
            return None;
        }
        let max_age = chrono::Duration::from_std(self.max_age).ok()?;
        now.checked_add_signed(max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_versioned_policy_header() {
        let policy = ResponseCachePolicy::for_version(Some("2.0"), &CacheConfig::default());
        assert_eq!(
            policy.cache_control_header(),
            "public, max-age=2592000, immutable"
        );
    }

    #[test]
    fn test_fallback_policy_header() {
        let policy = ResponseCachePolicy::for_version(None, &CacheConfig::default());
        assert_eq!(policy.cache_control_header(), "public, max-age=3600");

        let blank = ResponseCachePolicy::for_version(Some(""), &CacheConfig::default());
        assert_eq!(blank, policy);
    }

    #[test]
    fn test_no_cache_policy() {
        let policy = ResponseCachePolicy::no_cache();
        assert_eq!(
            policy.cache_control_header(),
            "no-cache, must-revalidate, max-age=0"
        );
        assert!(policy.expires_at(Utc::now()).is_none());
    }

    #[test]
    fn test_expires_at() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let policy = ResponseCachePolicy::fallback(Duration::from_secs(3600));
        assert_eq!(
            policy.expires_at(now),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap())
        );
    }
}

//! Response header assembly.

use chrono::{DateTime, Utc};
use http::header;

use crate::conditional::Fingerprint;
use crate::key::CacheKey;
use crate::policy::ResponseCachePolicy;
use crate::store::CacheStatus;

/// Header names for cache debugging.
pub mod header_names {
    /// Cache status header (HIT, MISS, ERROR).
    pub const X_CACHE_STATUS: &str = "X-Cache-Status";
    /// Cache key used for lookup.
    pub const X_CACHE_KEY: &str = "X-Cache-Key";
}

/// Content type of every rendered changelog.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Format a timestamp as an HTTP date (RFC 7231 IMF-fixdate).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builder for changelog response headers.
#[derive(Debug, Default)]
pub struct ResponseHeadersBuilder {
    content_type: Option<String>,
    cache_control: Option<String>,
    expires: Option<String>,
    etag: Option<String>,
    frame_domain: Option<String>,
    debug: Option<(CacheStatus, String)>,
}

impl ResponseHeadersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Content-Type.
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Set Cache-Control and Expires from a policy.
    pub fn cache_policy(mut self, policy: &ResponseCachePolicy, now: DateTime<Utc>) -> Self {
        self.cache_control = Some(policy.cache_control_header());
        self.expires = policy.expires_at(now).map(http_date);
        self
    }

    /// Set the ETag from a fingerprint.
    pub fn etag(mut self, fingerprint: &Fingerprint) -> Self {
        self.etag = Some(fingerprint.etag());
        self
    }

    /// Allow framing by the same origin and subdomains of `domain`.
    pub fn frame_ancestors(mut self, domain: impl Into<String>) -> Self {
        self.frame_domain = Some(domain.into());
        self
    }

    /// Attach cache debug headers.
    pub fn debug(mut self, status: CacheStatus, key: &CacheKey) -> Self {
        self.debug = Some((status, key.as_str().to_string()));
        self
    }

    /// Build the headers.
    pub fn build(self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(domain) = self.frame_domain {
            headers.push((header::X_FRAME_OPTIONS.as_str().to_string(), "SAMEORIGIN".to_string()));
            headers.push((
                header::CONTENT_SECURITY_POLICY.as_str().to_string(),
                format!("frame-ancestors 'self' *.{}", domain),
            ));
        }

        if let Some(ct) = self.content_type {
            headers.push((header::CONTENT_TYPE.as_str().to_string(), ct));
        }

        if let Some(cc) = self.cache_control {
            headers.push((header::CACHE_CONTROL.as_str().to_string(), cc));
        }

        if let Some(expires) = self.expires {
            headers.push((header::EXPIRES.as_str().to_string(), expires));
        }

        if let Some(etag) = self.etag {
            headers.push((header::ETAG.as_str().to_string(), etag));
        }

        if let Some((status, key)) = self.debug {
            headers.push((header_names::X_CACHE_STATUS.to_string(), status.to_string()));
            headers.push((header_names::X_CACHE_KEY.to_string(), key));
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_http_date() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 3).unwrap();
        assert_eq!(http_date(at), "Sat, 01 Jun 2024 09:05:03 GMT");
    }

    #[test]
    fn test_full_header_set() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let fp = Fingerprint::compute(b"body", Some("1.0"), now);
        let headers = ResponseHeadersBuilder::new()
            .content_type(HTML_CONTENT_TYPE)
            .cache_policy(&ResponseCachePolicy::fallback(Duration::from_secs(3600)), now)
            .etag(&fp)
            .frame_ancestors("example.com")
            .build();

        assert_eq!(find(&headers, "content-type"), Some("text/html; charset=UTF-8"));
        assert_eq!(find(&headers, "cache-control"), Some("public, max-age=3600"));
        assert_eq!(find(&headers, "expires"), Some("Sat, 01 Jun 2024 01:00:00 GMT"));
        assert_eq!(find(&headers, "etag"), Some(fp.etag().as_str()));
        assert_eq!(find(&headers, "x-frame-options"), Some("SAMEORIGIN"));
        assert_eq!(
            find(&headers, "content-security-policy"),
            Some("frame-ancestors 'self' *.example.com")
        );
        assert_eq!(find(&headers, header_names::X_CACHE_STATUS), None);
    }

    #[test]
    fn test_no_cache_has_no_expires() {
        let headers = ResponseHeadersBuilder::new()
            .cache_policy(&ResponseCachePolicy::no_cache(), Utc::now())
            .build();
        assert_eq!(find(&headers, "expires"), None);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_debug_headers() {
        let key = CacheKey::new("changelog:1:none:1.0.0");
        let headers = ResponseHeadersBuilder::new()
            .debug(CacheStatus::Hit, &key)
            .build();
        assert_eq!(find(&headers, "x-cache-status"), Some("HIT"));
        assert_eq!(find(&headers, "x-cache-key"), Some("changelog:1:none:1.0.0"));
    }
}

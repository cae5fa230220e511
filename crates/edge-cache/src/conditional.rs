//! Content fingerprints and the conditional-request gate.

use chrono::{DateTime, Utc};

use crate::key::known_version;

/// Content fingerprint used as the response ETag.
///
/// Computed from the raw changelog bytes plus the product version, or the
/// product's modification timestamp when no version is set. Computing it
/// needs neither parsing nor rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the source content.
    pub fn compute(content: &[u8], version: Option<&str>, modified: DateTime<Utc>) -> Self {
        let suffix = match known_version(version) {
            Some(v) => v.to_string(),
            None => modified.to_rfc3339(),
        };

        let mut data = Vec::with_capacity(content.len() + suffix.len());
        data.extend_from_slice(content);
        data.extend_from_slice(suffix.as_bytes());

        Self(format!("{:x}", md5::compute(&data)))
    }

    /// The bare hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The quoted strong ETag value.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Whether an `If-None-Match` value matches this fingerprint.
    ///
    /// Accepts `*`, comma-separated lists, and weak (`W/`) tags.
    pub fn matches(&self, if_none_match: &str) -> bool {
        let header = if_none_match.trim();
        if header == "*" {
            return true;
        }

        header
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .any(|tag| opaque_tag(tag) == Some(self.0.as_str()))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.etag())
    }
}

// Only quoted entity-tags are valid; a bare digest never matches.
fn opaque_tag(tag: &str) -> Option<&str> {
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.strip_prefix('"')?.strip_suffix('"')
}

/// Outcome of the conditional gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The client already holds the current representation.
    NotModified,
    /// Continue with cache lookup and rendering.
    Proceed,
}

/// Early-return gate evaluated before any cache lookup or rendering.
pub struct ConditionalGate;

impl ConditionalGate {
    /// Compare the client's validator against the current fingerprint.
    pub fn check(current: &Fingerprint, presented: Option<&str>) -> GateDecision {
        match presented {
            Some(validator) if current.matches(validator) => {
                tracing::debug!(etag = %current, "conditional request matched");
                GateDecision::NotModified
            }
            _ => GateDecision::Proceed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn modified() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_fingerprint_is_md5_of_content_and_version() {
        let fp = Fingerprint::compute(b"<h4>1.0</h4>", Some("1.0"), modified());
        let expected = format!("{:x}", md5::compute(b"<h4>1.0</h4>1.0"));
        assert_eq!(fp.as_str(), expected);
        assert_eq!(fp.etag(), format!("\"{}\"", expected));
    }

    #[test]
    fn test_fingerprint_falls_back_to_modified() {
        let a = Fingerprint::compute(b"text", None, modified());
        let b = Fingerprint::compute(b"text", None, modified() + chrono::Duration::seconds(1));
        assert_ne!(a, b);

        let expected = format!("{:x}", md5::compute(b"text2024-05-01T08:30:00+00:00"));
        assert_eq!(a.as_str(), expected);
    }

    #[test]
    fn test_fingerprint_ignores_modified_when_versioned() {
        let a = Fingerprint::compute(b"text", Some("2.0"), modified());
        let b = Fingerprint::compute(b"text", Some("2.0"), Utc::now());
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_tracks_content_and_version() {
        let base = Fingerprint::compute(b"text", Some("2.0"), modified());
        assert_ne!(base, Fingerprint::compute(b"text!", Some("2.0"), modified()));
        assert_ne!(base, Fingerprint::compute(b"text", Some("2.1"), modified()));
    }

    #[test]
    fn test_unquoted_digest_does_not_match() {
        let fp = Fingerprint::compute(b"x", Some("1"), modified());
        assert!(!fp.matches(fp.as_str()));
        assert!(!fp.matches(&format!("W/{}", fp.as_str())));
        assert!(!fp.matches(&format!("\"{}", fp.as_str())));
    }

    #[test]
    fn test_fingerprint_keeps_version_verbatim() {
        let padded = Fingerprint::compute(b"text", Some(" 2.0"), modified());
        let expected = format!("{:x}", md5::compute(b"text 2.0"));
        assert_eq!(padded.as_str(), expected);
    }

    #[test]
    fn test_matches_exact_and_lists() {
        let fp = Fingerprint::compute(b"x", Some("1"), modified());
        assert!(fp.matches(&fp.etag()));
        assert!(fp.matches(&format!("W/{}", fp.etag())));
        assert!(fp.matches(&format!("\"other\", {}", fp.etag())));
        assert!(fp.matches("*"));
        assert!(!fp.matches("\"other\""));
        assert!(!fp.matches(""));
    }

    #[test]
    fn test_gate() {
        let fp = Fingerprint::compute(b"x", Some("1"), modified());
        assert_eq!(
            ConditionalGate::check(&fp, Some(&fp.etag())),
            GateDecision::NotModified
        );
        assert_eq!(ConditionalGate::check(&fp, Some("\"stale\"")), GateDecision::Proceed);
        assert_eq!(ConditionalGate::check(&fp, None), GateDecision::Proceed);
    }
}

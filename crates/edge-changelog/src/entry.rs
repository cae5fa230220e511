//! Parsed changelog entries.

use serde::{Deserialize, Serialize};

/// One version entry of a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Version number taken from the heading (`1.2` or `1.2.3`).
    pub version: String,
    /// Release date as ISO-8601, when the heading carries a known date form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Heading text exactly as authored.
    pub raw_heading: String,
    /// Markup between this heading and the next, with boundary-level
    /// subsection headings rewritten.
    pub content: String,
}

impl ChangelogEntry {
    /// Anchor id used for the entry's permalink.
    pub fn anchor(&self) -> String {
        format!("version-{}", self.version)
    }

    /// Rebuild the entry as boundary heading plus content.
    pub fn to_source(&self) -> String {
        format!("<h4>{}</h4>{}", self.raw_heading, self.content)
    }
}

/// Concatenate entries back into splittable source markup.
pub fn entries_to_source(entries: &[ChangelogEntry]) -> String {
    entries.iter().map(ChangelogEntry::to_source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(version: &str) -> ChangelogEntry {
        ChangelogEntry {
            version: version.to_string(),
            date: None,
            raw_heading: format!("{} on June 1, 2024", version),
            content: "<p>Fixed X</p>".to_string(),
        }
    }

    #[test]
    fn test_anchor() {
        assert_eq!(entry("1.2.0").anchor(), "version-1.2.0");
    }

    #[test]
    fn test_to_source() {
        assert_eq!(
            entries_to_source(&[entry("1.2.0"), entry("1.1.0")]),
            "<h4>1.2.0 on June 1, 2024</h4><p>Fixed X</p><h4>1.1.0 on June 1, 2024</h4><p>Fixed X</p>"
        );
    }

    #[test]
    fn test_date_omitted_when_absent() {
        let json = serde_json::to_value(entry("1.0")).unwrap();
        assert!(json.get("date").is_none());
        assert_eq!(json["version"], "1.0");
    }
}

//! Splitting changelog HTML into version entries.
//!
//! Changelogs have no formal grammar. Entries are delimited by `<h4>`
//! headings whose text contains a version number; everything up to the next
//! such heading belongs to the entry.

use std::sync::LazyLock;

use regex::Regex;

use crate::entry::ChangelogEntry;
use crate::fields::{extract_date, extract_version};

static VERSION_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<h4[^>]*>([^<]*\d+\.\d+(?:\.\d+)?[^<]*)</h4>").unwrap()
});

static SUBSECTION_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)h4\b").unwrap());

/// Turns normalized HTML into an ordered list of entries.
pub trait EntrySplitter {
    /// Split `html` into entries, in source order.
    fn split(&self, html: &str) -> Vec<ChangelogEntry>;
}

/// Splitter keyed on version-bearing `<h4>` headings.
///
/// Markup before the first version heading is dropped. Other `<h4>`
/// headings inside an entry are rewritten to `<h3>` so they can never be
/// mistaken for boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingSplitter;

impl HeadingSplitter {
    /// Create a splitter.
    pub fn new() -> Self {
        Self
    }
}

impl EntrySplitter for HeadingSplitter {
    fn split(&self, html: &str) -> Vec<ChangelogEntry> {
        let headings: Vec<_> = VERSION_HEADING_RE.captures_iter(html).collect();
        let mut entries = Vec::with_capacity(headings.len());

        for (i, caps) in headings.iter().enumerate() {
            let (Some(whole), Some(text)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let raw_heading = text.as_str().trim();
            let Some(version) = extract_version(raw_heading) else {
                tracing::debug!(heading = raw_heading, "dropping entry without version");
                continue;
            };

            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let content = demote_subsections(html[whole.end()..end].trim());

            entries.push(ChangelogEntry {
                version: version.to_string(),
                date: extract_date(raw_heading),
                raw_heading: raw_heading.to_string(),
                content,
            });
        }

        tracing::debug!(entries = entries.len(), "split changelog");
        entries
    }
}

fn demote_subsections(content: &str) -> String {
    SUBSECTION_HEADING_RE
        .replace_all(content, "<${1}h3")
        .into_owned()
}

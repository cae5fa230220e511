//! Encoding repair for raw changelog text.
//!
//! Changelogs pasted through admin forms regularly arrive with emoji that
//! were decoded as Windows-1252 (or Latin-1) and re-encoded as UTF-8. The
//! normalizer undoes the common cases before anything else looks at the text.

use std::collections::HashMap;
use std::sync::LazyLock;

use edge_core::EncodingConfig;

/// Windows-1252 code points for bytes 0x80..=0x9F. Bytes the code page leaves
/// undefined map to the matching C1 control, as browsers do.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Symbols used as section markers in changelogs.
const SECTION_SYMBOLS: &[&str] = &[
    "🚀", "🐛", "✨", "🔧", "🎉", "📝", "⚡", "🛡️", "🔥", "💡", "🎯", "✅", "❌", "📋", "🔨", "🔄",
];

/// Repairs for a bare `ð` left over when every continuation byte was lost.
/// Only the section word that follows tells the symbols apart.
const CONTEXT_REPAIRS: &[(&str, &str)] = &[
    ("ð Initial", "🚀 Initial"),
    ("ð Added", "✨ Added"),
    ("ð Fixed", "🐛 Fixed"),
    ("ð Changed", "🔧 Changed"),
    ("ð Improved", "⚡ Improved"),
    ("ð Updated", "🔄 Updated"),
    ("ð Security", "🛡️ Security"),
    ("ð Performance", "🚀 Performance"),
];

fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

fn cp1252_byte(c: char) -> Option<u8> {
    let code = c as u32;
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }
    CP1252_HIGH
        .iter()
        .position(|&high| high == c)
        .map(|i| 0x80 + i as u8)
}

/// Decode bytes as Windows-1252.
pub fn decode_cp1252(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| cp1252_char(b)).collect()
}

/// Decode raw input: UTF-8 when valid, Windows-1252 otherwise.
pub fn decode_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!(len = raw.len(), "input is not UTF-8, decoding as Windows-1252");
            decode_cp1252(raw)
        }
    }
}

/// Undo one round of UTF-8 -> Windows-1252 -> UTF-8 double encoding.
///
/// Only applies when the whole text maps back to bytes that are valid UTF-8
/// and differ from the input; anything else is returned unchanged.
pub fn repair_double_encoding(text: &str) -> Option<String> {
    let bytes: Option<Vec<u8>> = text.chars().map(cp1252_byte).collect();
    let repaired = String::from_utf8(bytes?).ok()?;
    (repaired != text).then_some(repaired)
}

/// Mis-transcoded forms of `symbol`: its UTF-8 bytes read as Windows-1252,
/// read as Latin-1, and read as Latin-1 with the C1 controls stripped.
fn broken_forms(symbol: &str) -> Vec<String> {
    let bytes = symbol.as_bytes();
    let cp1252 = decode_cp1252(bytes);
    let latin1: String = bytes.iter().map(|&b| b as char).collect();
    let stripped: String = latin1
        .chars()
        .filter(|c| !('\u{80}'..='\u{9F}').contains(c))
        .collect();

    let mut forms = vec![cp1252, latin1];
    // A lone lead byte carries no information about the symbol.
    if stripped.chars().count() > 1 {
        forms.push(stripped);
    }
    forms.dedup();
    forms
}

/// Substitution table, longest key first. A key produced by more than one
/// symbol is ambiguous and left out.
static SYMBOL_TABLE: LazyLock<Vec<(String, &'static str)>> = LazyLock::new(|| {
    let mut owners: HashMap<String, Vec<&'static str>> = HashMap::new();
    for &symbol in SECTION_SYMBOLS {
        for form in broken_forms(symbol) {
            let entry = owners.entry(form).or_default();
            if !entry.contains(&symbol) {
                entry.push(symbol);
            }
        }
    }

    let mut table: Vec<(String, &'static str)> = owners
        .into_iter()
        .filter_map(|(key, symbols)| match symbols.as_slice() {
            [symbol] => Some((key, *symbol)),
            _ => None,
        })
        .collect();
    table.sort_by(|a, b| {
        b.0.chars()
            .count()
            .cmp(&a.0.chars().count())
            .then_with(|| a.0.cmp(&b.0))
    });
    table
});

/// Encoding normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    repair_double_encoding: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            repair_double_encoding: true,
        }
    }
}

impl Normalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer from `[encoding]` settings.
    pub fn from_config(config: &EncodingConfig) -> Self {
        Self {
            repair_double_encoding: config.repair_double_encoding,
        }
    }

    /// Enable or disable the whole-text double-encoding repair.
    pub fn with_double_encoding_repair(mut self, enabled: bool) -> Self {
        self.repair_double_encoding = enabled;
        self
    }

    /// Normalize raw bytes into repaired UTF-8 text.
    pub fn normalize(&self, raw: &[u8]) -> String {
        self.normalize_str(&decode_text(raw))
    }

    /// Repair already-decoded text.
    pub fn normalize_str(&self, text: &str) -> String {
        let mut content = text.to_string();

        for (broken, fixed) in SYMBOL_TABLE.iter() {
            if content.contains(broken.as_str()) {
                content = content.replace(broken.as_str(), fixed);
                tracing::debug!(symbol = *fixed, "repaired mis-encoded symbol");
            }
        }

        for &(broken, fixed) in CONTEXT_REPAIRS {
            if content.contains(broken) {
                content = content.replace(broken, fixed);
                tracing::debug!(repair = fixed, "repaired truncated symbol");
            }
        }

        if self.repair_double_encoding {
            if let Some(repaired) = repair_double_encoding(&content) {
                tracing::debug!("repaired double-encoded text");
                content = repaired;
            }
        }

        content
    }
}

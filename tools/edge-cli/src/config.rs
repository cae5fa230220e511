//! Config file discovery and the starter template.

use std::path::{Path, PathBuf};

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["changelog.toml", ".changelog.toml", "changelog.json"];

/// Find a config file in `start` or any of its parents.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Commented starter config written by `changelog config init`.
pub fn generate_default_config(site_domain: &str) -> String {
    format!(
        r#"# Changelog endpoint configuration

# Part of every cache key. Bump it when the page template changes.
renderer_version = "1.0.0"

# Pages may only be framed by this domain and its subdomains.
site_domain = "{site_domain}"

# URL segment the changelog is served under.
endpoint_slug = "changelog"

# Always attach X-Cache-Status / X-Cache-Key.
debug_headers = false

[cache]
key_prefix = "changelog"
# 30 days; versioned pages are immutable.
versioned_max_age_secs = 2592000
fallback_max_age_secs = 3600

[encoding]
repair_double_encoding = true

[render]
locale = "en-US"
# stylesheet_url = "https://{site_domain}/assets/changelog.css"

[log]
level = "info"
format = "json"
"#
    )
}

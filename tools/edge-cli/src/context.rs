//! CLI execution context.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use edge_core::ChangelogConfig;

use crate::config::find_config;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Service configuration.
    pub config: ChangelogConfig,
    /// Where the configuration was loaded from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from an explicit config file, or the nearest one found
    /// from the working directory up. Falls back to defaults.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => find_config(&cwd),
        };

        let config = match &config_path {
            Some(path) => ChangelogConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => ChangelogConfig::default(),
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Read an input file relative to the working directory.
    pub fn read_input(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve_path(path);
        std::fs::read(&resolved).with_context(|| format!("Failed to read {}", resolved.display()))
    }

    /// Modification time of an input file.
    pub fn input_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let resolved = self.resolve_path(path);
        let modified = std::fs::metadata(&resolved)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Failed to stat {}", resolved.display()))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}

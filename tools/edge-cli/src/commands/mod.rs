//! CLI command implementations.

pub mod config;
pub mod etag;
pub mod parse;
pub mod render;

use clap::{Args, Subcommand};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Changelog HTML file.
    pub file: String,

    /// Skip encoding repair and parse the file as-is.
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Changelog HTML file.
    pub file: String,

    /// Product name shown in the page title.
    #[arg(short, long, default_value = "Local Product")]
    pub name: String,

    /// Product slug the page is requested under.
    #[arg(short, long, default_value = "local-product")]
    pub slug: String,

    /// Product id used in the cache key.
    #[arg(long, default_value = "local")]
    pub id: String,

    /// Current product version.
    #[arg(long = "product-version")]
    pub version: Option<String>,

    /// Product page URL.
    #[arg(long, default_value = "http://localhost/downloads/local-product/")]
    pub url: String,

    /// Cache rendered pages in this directory.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Send this If-None-Match value.
    #[arg(long)]
    pub if_none_match: Option<String>,

    /// Request the page as a privileged viewer.
    #[arg(long)]
    pub privileged: bool,

    /// Write the page body here instead of stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the etag command.
#[derive(Args)]
pub struct EtagArgs {
    /// Changelog HTML file.
    pub file: String,

    /// Current product version.
    #[arg(long = "product-version")]
    pub version: Option<String>,

    /// Product modification time (RFC 3339). Defaults to the file's mtime.
    #[arg(long)]
    pub modified: Option<String>,

    /// Product id used in the cache key.
    #[arg(long, default_value = "local")]
    pub id: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Site domain allowed to frame the page.
        #[arg(long, default_value = "localhost")]
        site_domain: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

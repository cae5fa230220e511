//! Changelog CLI - Work with product changelogs locally.
//!
//! Commands:
//! - `changelog parse` - Split a changelog file into entries
//! - `changelog render` - Render a changelog page through the service
//! - `changelog etag` - Print the fingerprint a changelog is served with
//! - `changelog config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConfigArgs, EtagArgs, ParseArgs, RenderArgs};

/// Changelog CLI - Parse, render and fingerprint product changelogs
#[derive(Parser)]
#[command(name = "changelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a changelog file into versioned entries
    Parse(ParseArgs),

    /// Render the changelog page for a file
    Render(RenderArgs),

    /// Print the ETag a changelog file is served with
    Etag(EtagArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::Output::new(cli.verbose, cli.json).error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Parse(args) => commands::parse::run(args, &ctx),
        Commands::Render(args) => commands::render::run(args, &ctx),
        Commands::Etag(args) => commands::etag::run(args, &ctx),
        Commands::Config(args) => commands::config::run(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Send `tracing` events to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

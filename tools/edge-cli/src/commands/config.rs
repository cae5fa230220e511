//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_FILE_NAMES};
use crate::context::Context;

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { site_domain, force } => init_config(&site_domain, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "(defaults)"),
    }

    println!();
    print!("{}", ctx.config.to_toml()?);

    Ok(())
}

fn init_config(site_domain: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config(site_domain))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    ctx.config.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    if ctx.config_path.is_none() {
        warnings.push("no config file found, using defaults".to_string());
    }

    if ctx.config.site_domain == "localhost" {
        warnings.push("site_domain is 'localhost'; pages cannot be framed elsewhere".to_string());
    }

    if ctx.config.debug_headers {
        warnings.push("debug_headers exposes cache keys to every client".to_string());
    }

    if let Some(url) = &ctx.config.render.stylesheet_url {
        if !url.starts_with("https://") && !url.starts_with('/') {
            warnings.push(format!("render.stylesheet_url '{}' is not https", url));
        }
    }

    if !matches!(ctx.config.log.format.as_str(), "json" | "human") {
        warnings.push(format!(
            "log.format '{}' is unknown, json will be used",
            ctx.config.log.format
        ));
    }

    if ctx.config.cache.fallback_max_age_secs > ctx.config.cache.versioned_max_age_secs {
        warnings.push(
            "cache.fallback_max_age_secs exceeds cache.versioned_max_age_secs".to_string(),
        );
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}

//! Init command implementation - writes a starter scanwatch.yml

use anyhow::{Context, Result};
use std::path::Path;
use sw_core::config::SAMPLE_CONFIG;
use sw_core::Config;

use crate::cli::{GlobalArgs, InitArgs};

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let path = Path::new(&global.config);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    let content = render_config(&args.name)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    println!("\nNext steps:");
    println!("  1. Point source.path at your telemetry database or snapshot");
    println!("  2. Run: scanwatch run --dry-run");
    Ok(())
}

/// Sample configuration with `name` filled in, validated before writing
pub(crate) fn render_config(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        anyhow::bail!(
            "Invalid name '{}': use letters, digits, '-' and '_' only",
            name
        );
    }
    let content = SAMPLE_CONFIG.replacen("name: scanwatch", &format!("name: {name}"), 1);
    Config::parse(&content).context("Generated configuration is invalid")?;
    Ok(content)
}

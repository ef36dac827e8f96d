use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use civic_cms::config::Config;

pub mod format;

/// Load configuration from `path`, or from the standard search path
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            Config::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Config::load().context("Failed to load configuration"),
    }
}

/// Success message with checkmark
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Info message
pub fn info(message: &str) {
    println!("{} {}", "→".blue().bold(), message);
}

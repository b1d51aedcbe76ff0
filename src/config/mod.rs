// Configuration module for appsinstalled-loader
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LoaderConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration (or defaults when no file is given) with environment overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: Option<P>) -> Result<LoaderConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => LoaderConfig::default(),
    };

    // Allow environment variables to override config values
    if let Ok(pattern) = std::env::var("LOADER_PATTERN") {
        config.loader.pattern = pattern;
    }

    if let Ok(workers) = std::env::var("LOADER_WORKERS") {
        config.loader.workers = workers
            .parse()
            .with_context(|| format!("LOADER_WORKERS must be a number, got '{}'", workers))?;
    }

    Ok(config)
}

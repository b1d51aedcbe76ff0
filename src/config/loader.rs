// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoaderConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse YAML content; validation is left to the caller so CLI overrides apply first
    pub fn parse(content: &str) -> Result<LoaderConfig> {
        let content = Self::substitute_env_vars(content)?;

        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${IDFA_ADDR:-127.0.0.1:33013} -> 127.0.0.1:33013 (if IDFA_ADDR not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &LoaderConfig) -> Result<()> {
        if config.loader.pattern.trim().is_empty() {
            bail!("loader.pattern is required (set it in the config file or pass --pattern)");
        }

        if config.loader.workers == 0 {
            bail!("loader.workers must be > 0");
        }

        let threshold = config.loader.error_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            bail!("loader.error_threshold must be in (0, 1], got {}", threshold);
        }

        if config.storage.destinations.is_empty() {
            bail!("storage.destinations must name at least one device type");
        }

        for (device_type, addr) in &config.storage.destinations {
            if device_type.is_empty() {
                bail!("storage.destinations contains an empty device type");
            }
            match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
                _ => bail!(
                    "storage.destinations.{}: expected host:port, got '{}'",
                    device_type,
                    addr
                ),
            }
        }

        if config.storage.timeout_ms == 0 {
            bail!("storage.timeout_ms must be > 0");
        }

        if config.storage.queue_capacity == 0 {
            bail!("storage.queue_capacity must be > 0");
        }

        if config.storage.max_attempts == 0 {
            bail!("storage.max_attempts must be > 0");
        }

        Ok(())
    }
}

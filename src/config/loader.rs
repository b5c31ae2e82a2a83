//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed or validated.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    config.validate()?;

    info!(
        "Configuration loaded: {} rules, {} dependencies, policy={}",
        config.rules.len(),
        config.dependencies.len(),
        config.policy
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `ACL_REORDER_LOG_LEVEL`: Override log level
/// - `ACL_REORDER_PACKETS`: Override number of simulated packets
/// - `ACL_REORDER_SEED`: Override simulation seed
///
/// # Errors
///
/// Returns `ConfigError` if loading or parsing fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Apply overrides looked up through `lookup`
///
/// Split out from [`load_config_with_env`] so overrides can be exercised
/// without touching the process environment.
///
/// # Errors
///
/// Returns `ConfigError::EnvError` if an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup("ACL_REORDER_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Some(packets) = lookup("ACL_REORDER_PACKETS") {
        config.simulation.packets = packets.parse().map_err(|_| ConfigError::EnvError {
            name: "ACL_REORDER_PACKETS".into(),
            reason: format!("Invalid number: {packets}"),
        })?;
        debug!("Packets overridden to {}", config.simulation.packets);
    }

    if let Some(seed) = lookup("ACL_REORDER_SEED") {
        config.simulation.seed = seed.parse().map_err(|_| ConfigError::EnvError {
            name: "ACL_REORDER_SEED".into(),
            reason: format!("Invalid seed: {seed}"),
        })?;
        debug!("Seed overridden to {}", config.simulation.seed);
    }

    Ok(())
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}

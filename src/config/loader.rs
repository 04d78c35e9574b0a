//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::types::Environment;

/// Environment variables that override the per-environment API keys.
pub const PRODUCTION_API_KEY_VAR: &str = "EDGE_ROUTER_PRODUCTION_API_KEY";
pub const STAGING_API_KEY_VAR: &str = "EDGE_ROUTER_STAGING_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid rule {rule}: {source}")]
    Rule {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid language tag: {0}")]
    Language(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// API keys found in the process environment override the file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply secret overrides from an environment source.
pub fn apply_env_overrides<F>(config: &mut RouterConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (environment, var) in [
        (Environment::Production, PRODUCTION_API_KEY_VAR),
        (Environment::Staging, STAGING_API_KEY_VAR),
    ] {
        if let Some(key) = lookup(var).filter(|k| !k.is_empty()) {
            tracing::debug!(environment = %environment, "API key provided by environment");
            *config.api.keys.get_mut(environment) = Some(key);
        }
    }
}

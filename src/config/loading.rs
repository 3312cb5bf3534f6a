//! Configuration loading from files
//!
//! TOML is the native format. Files ending in `.json` are read with
//! `serde_json` in either the native layout or the older PascalCase layout
//! (see [`super::legacy`]), told apart by their top-level keys.

use anyhow::{Context, Result};
use std::path::Path;

use super::defaults;
use super::legacy::{self, LegacyConfig};
use super::types::{BackendConfig, Config, ConfigFormat};
use crate::types::{HostName, Port, ServerName};

/// Parse configuration text in the given format without validating it
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(content)?;
            if legacy::is_legacy_layout(&value) {
                serde_json::from_value::<LegacyConfig>(value)?.try_into()?
            } else {
                serde_json::from_value(value)?
            }
        }
    };
    Ok(config)
}

/// Load and validate configuration from a file
///
/// The format is picked from the file extension (see [`ConfigFormat::from_path`]).
pub fn load_config(config_path: impl AsRef<Path>) -> Result<Config> {
    let path = config_path.as_ref();
    let config_content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    let config = parse_config(&config_content, ConfigFormat::from_path(path))
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file '{}'", path.display()))?;

    Ok(config)
}

/// Serialize a configuration to `path` in the format its extension implies
pub fn write_config(config_path: impl AsRef<Path>, config: &Config) -> Result<()> {
    let path = config_path.as_ref();
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))
}

/// Create a default configuration for examples/testing
///
/// Contains a single placeholder backend and no users; nobody can log in
/// until at least one `[[users]]` entry is added.
#[must_use]
pub fn create_default_config() -> Config {
    Config {
        backends: vec![BackendConfig {
            name: ServerName::new("example".to_string())
                .unwrap_or_else(|_| unreachable!("literal is non-empty")),
            host: HostName::new("news.example.com".to_string())
                .unwrap_or_else(|_| unreachable!("literal is non-empty")),
            port: Port::NNTP,
            use_tls: false,
            tls_verify_cert: defaults::tls_verify_cert(),
            username: "proxyuser".to_string(),
            password: "changeme".to_string(),
            max_connections: defaults::backend_max_connections(),
        }],
        ..Default::default()
    }
}

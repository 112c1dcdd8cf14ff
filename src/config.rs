//! Application configuration with TOML file support.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

/// Settings for the command-line front end.
///
/// Every field has a default, so an empty or missing file is valid.
/// Command-line flags override whatever the file says.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database file path.
    #[serde(default = "default_database")]
    pub database: String,

    /// Log filter used when `RUST_LOG` is not set (e.g. "warn", "divvy=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Symbol printed in front of amounts.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => Ok(Self::default()),
        }
    }
}

fn default_database() -> String {
    "divvy.db".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

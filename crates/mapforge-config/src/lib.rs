//! Configuration for the MapForge graph compilers.
//!
//! The only knob is cosmetic: the display name of the root reference in
//! emitted graphs. It never changes what a compiled graph computes.
//!
//! # Examples
//!
//! ```
//! use mapforge_config::CompilerConfig;
//!
//! let config = CompilerConfig::from_toml_str(r#"root_name = "person""#).unwrap();
//! assert_eq!(config.root_name, "person");
//!
//! let config = CompilerConfig::default();
//! assert_eq!(config.root_name, "x");
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use mapforge_config::CompilerConfig;
//!
//! let config = CompilerConfig::load("mapforge.toml").unwrap_or_default();
//! ```

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root reference name used when none is configured.
pub const DEFAULT_ROOT_NAME: &str = "x";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Graph compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct CompilerConfig {
    /// Display name of the root reference in emitted graphs.
    pub root_name: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML, or fails
    /// [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the root reference display name.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Checks that the root name is a plain identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut chars = self.root_name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid(format!(
                "root_name `{}` is not an identifier",
                self.root_name
            )));
        }
        Ok(())
    }
}

//! Runtime configuration
//!
//! Options can be built in code or read from the `[runtime]` table of a
//! TOML file:
//!
//! ```toml
//! [runtime]
//! auto_package = true
//! collect_diagnostics = true
//! namespaces = ["model", "event"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Options of a [`crate::Runtime`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Place unpackaged types in the namespace of their first packaged
    /// ancestor when they are bound
    pub auto_package: bool,

    /// Purge diagnostic objects one construction cycle after completion
    pub collect_diagnostics: bool,

    /// Namespaces to create up front, besides the system ones
    pub namespaces: Vec<String>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            auto_package: true,
            collect_diagnostics: true,
            namespaces: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeOptions,
}

impl RuntimeOptions {
    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.runtime.validate()?;
        Ok(file.runtime)
    }

    /// Read options from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Disable auto-packaging
    pub fn without_auto_package(mut self) -> Self {
        self.auto_package = false;
        self
    }

    /// Disable diagnostic collection
    pub fn without_collection(mut self) -> Self {
        self.collect_diagnostics = false;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.namespaces {
            if name.is_empty() || name.contains('.') {
                return Err(ConfigError::ValidationError(format!(
                    "namespace name {:?} must be non-empty and contain no '.'",
                    name
                )));
            }
        }
        Ok(())
    }
}

//! Configuration file structures for vm-bridge.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`GuestConfig`]: Location of the assembler/VM guest module

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BridgeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [runtime.engine]
/// optimize = true
/// consume_fuel = true
///
/// [runtime.execution]
/// max_fuel = 10_000_000
/// memory_pages = 1
///
/// [guest]
/// module = "www/main.wasm"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Engine and guest call settings.
    #[serde(default)]
    pub runtime: BridgeConfig,

    /// Guest module settings.
    #[serde(default)]
    pub guest: GuestConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        debug!(path = %path.display(), "Loading config file");

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// Guest module configuration from config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuestConfig {
    /// Path to the guest module (`.wasm` binary or `.wat` text).
    #[serde(default = "defaults::module")]
    pub module: String,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            module: defaults::module(),
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn module() -> String {
        "www/main.wasm".to_string()
    }
}

//! Configuration schema for Fancy
//!
//! Configuration is stored at `~/.config/fancy/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package cache settings
    pub cache: CacheConfig,

    /// Package registry settings
    pub registry: RegistryConfig,

    /// Interpreter used to run command packages
    pub runtime: RuntimeConfig,

    /// Command name to package name table
    pub commands: CommandsConfig,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Print full error details
    pub debug: bool,
}

/// Package cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache home, defaults to `~/.fancy-cli`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,

    /// Directory under the cache home holding installed packages
    pub dir_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            home: None,
            dir_name: "dependencies".to_string(),
        }
    }
}

/// Package registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,

    /// Timeout for a single registry request
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://registry.npmjs.org".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter program that loads command packages
    pub interpreter: String,

    /// Oldest interpreter version accepted
    pub min_version: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interpreter: "node".to_string(),
            min_version: "12.0.0".to_string(),
        }
    }
}

/// Command table
///
/// `Settings` merges the file's entries over the built-in `init` mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandsConfig(pub BTreeMap<String, String>);

impl Default for CommandsConfig {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert("init".to_string(), "@fancy-cli/init".to_string());
        Self(table)
    }
}

impl CommandsConfig {
    /// Package backing a command
    pub fn package_for(&self, command: &str) -> Option<&str> {
        self.0.get(command).map(String::as_str)
    }
}

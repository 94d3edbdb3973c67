//! Configuration management for Fancy

pub mod schema;

pub use schema::{CommandsConfig, Config, RegistryConfig, RuntimeConfig};

use crate::error::{FancyError, FancyResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the cache home directory under the user's home
pub const DEFAULT_CLI_HOME: &str = ".fancy-cli";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fancy")
            .join("config.toml")
    }

    /// Get the default cache home
    pub fn default_cache_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CLI_HOME)
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> FancyResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> FancyResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FancyError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| FancyError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> FancyResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            FancyError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    async fn ensure_config_dir(&self) -> FancyResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FancyError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Run a local module directly instead of a cached package
    pub target_path: Option<PathBuf>,
    /// Relocate the cache home
    pub cache_home: Option<PathBuf>,
    /// Print full error details and raise the log level
    pub debug: bool,
}

/// Effective settings, built once at startup and passed down by reference.
///
/// Nothing below this struct reads the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub target_path: Option<PathBuf>,
    pub cache_home: PathBuf,
    pub cache_dir_name: String,
    pub debug: bool,
    pub registry: RegistryConfig,
    pub runtime: RuntimeConfig,
    pub commands: CommandsConfig,
}

impl Settings {
    /// Merge the file configuration with command-line overrides
    pub fn resolve(config: &Config, overrides: Overrides) -> Self {
        let cache_home = overrides
            .cache_home
            .or_else(|| config.cache.home.clone())
            .unwrap_or_else(ConfigManager::default_cache_home);

        let mut commands = CommandsConfig::default();
        commands
            .0
            .extend(config.commands.0.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            target_path: overrides.target_path,
            cache_home,
            cache_dir_name: config.cache.dir_name.clone(),
            debug: overrides.debug || config.general.debug,
            registry: config.registry.clone(),
            runtime: config.runtime.clone(),
            commands,
        }
    }

    /// Root the registry client installs into: `{cache_home}/dependencies`
    pub fn dependencies_dir(&self) -> PathBuf {
        self.cache_home.join(&self.cache_dir_name)
    }

    /// Directory holding one sub-directory per cached (name, version)
    pub fn store_dir(&self) -> PathBuf {
        self.dependencies_dir().join("node_modules")
    }
}

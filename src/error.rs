//! Error types for Fancy
//!
//! All modules use `FancyResult<T>` as their return type. The version gate and
//! the package cache have their own enums which convert into `FancyError`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Fancy operations
pub type FancyResult<T> = Result<T, FancyError>;

/// Host runtime version problems
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Runtime version {current} is too old, at least {required} is required")]
    TooOld { current: String, required: String },

    #[error("Invalid version '{value}': {reason}")]
    Invalid { value: String, reason: String },
}

/// Failures while installing or updating a cached package
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Failed to fetch {package}@{version}: {reason}")]
    FetchFailed {
        package: String,
        version: String,
        reason: String,
    },

    #[error("Registry request for {package} timed out")]
    Timeout { package: String },

    #[error("Registry has no latest version for {package}")]
    NoLatestVersion { package: String },

    #[error("Version {version} of {package} not found in registry")]
    VersionNotFound { package: String, version: String },

    #[error("Integrity check failed for {package}@{version}")]
    Integrity { package: String, version: String },

    #[error("{path} is not a managed cache entry")]
    Unmanaged { path: PathBuf },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch failure
    pub fn fetch_failed(
        package: impl Into<String>,
        version: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::FetchFailed {
            package: package.into(),
            version: version.into(),
            reason: reason.to_string(),
        }
    }
}

/// All errors that can occur in Fancy
#[derive(Error, Debug)]
pub enum FancyError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Install(#[from] InstallError),

    // Configuration errors
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid package spec: {0}")]
    InvalidSpec(String),

    // Process errors
    #[error("Failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl FancyError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Install(InstallError::Timeout { .. })
                | Self::Install(InstallError::FetchFailed { .. })
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Version(VersionError::TooOld { .. }) => {
                Some("Upgrade the runtime or lower runtime.min_version in the config")
            }
            Self::UnknownCommand(_) => Some("Map the command to a package under [commands]"),
            Self::Install(InstallError::Timeout { .. }) => {
                Some("Check the network or raise registry.timeout_secs")
            }
            Self::Spawn { .. } => Some("Check runtime.interpreter in the config"),
            _ => None,
        }
    }
}

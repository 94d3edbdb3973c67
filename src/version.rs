//! Host runtime version gate

use crate::error::{FancyError, FancyResult, VersionError};
use semver::Version;
use tokio::process::Command;
use tracing::debug;

/// Parse a version the way runtimes print it (`v18.12.1`, `18.12.1\n`)
pub fn parse_version(value: &str) -> Result<Version, VersionError> {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| VersionError::Invalid {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Fail with [`VersionError::TooOld`] when `current` is older than `min`
pub fn check(current: &str, min: &str) -> Result<(), VersionError> {
    let current_version = parse_version(current)?;
    let min_version = parse_version(min)?;

    if current_version < min_version {
        return Err(VersionError::TooOld {
            current: current_version.to_string(),
            required: min_version.to_string(),
        });
    }
    Ok(())
}

/// Ask the interpreter for its version (`node --version`)
pub async fn probe_interpreter(interpreter: &str) -> FancyResult<String> {
    let output = Command::new(interpreter)
        .arg("--version")
        .output()
        .await
        .map_err(|e| FancyError::spawn(interpreter, e))?;

    if !output.status.success() {
        return Err(FancyError::command_exec(
            format!("{} --version", interpreter),
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!("{} reports version {}", interpreter, version);
    Ok(version)
}

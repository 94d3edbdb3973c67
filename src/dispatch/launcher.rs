//! Isolated execution of command packages
//!
//! Each command runs in a fresh interpreter process so a crashing package
//! cannot take the dispatcher down and every run starts with a clean module
//! cache.

use crate::config::Settings;
use crate::error::{FancyError, FancyResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Runs an entry file with a list of call arguments and reports its exit code
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, entry: &Path, call_args: &[Value]) -> FancyResult<i32>;
}

/// Script that loads `entry` and calls its export with `call_args`
///
/// Both values are embedded as JSON literals, which are valid JavaScript.
pub fn bootstrap_script(entry: &Path, call_args: &[Value]) -> FancyResult<String> {
    let entry = serde_json::to_string(&entry.to_string_lossy())?;
    let args = serde_json::to_string(call_args)?;
    Ok(format!(
        "const m = require({entry}); (typeof m === 'function' ? m : m.default).call(null, {args})"
    ))
}

/// Exit code of a finished child; on Unix a signal death maps to `128 + signal`
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Launches `{interpreter} -e <bootstrap>` with inherited stdio
#[derive(Debug, Clone)]
pub struct NodeLauncher {
    interpreter: String,
    env: Vec<(String, String)>,
}

impl NodeLauncher {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            env: Vec::new(),
        }
    }

    /// Launcher for the configured interpreter, passing the cache home and
    /// debug level down to the child
    pub fn from_settings(settings: &Settings) -> Self {
        let launcher = Self::new(settings.runtime.interpreter.clone())
            .with_env("CLI_HOME_PATH", settings.cache_home.to_string_lossy());
        if settings.debug {
            launcher.with_env("LOG_LEVEL", "verbose")
        } else {
            launcher
        }
    }

    /// Add an environment variable for the child
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl Launcher for NodeLauncher {
    async fn launch(&self, entry: &Path, call_args: &[Value]) -> FancyResult<i32> {
        let script = bootstrap_script(entry, call_args)?;
        debug!("Launching {} for {}", self.interpreter, entry.display());

        let status = Command::new(&self.interpreter)
            .arg("-e")
            .arg(&script)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| FancyError::spawn(&self.interpreter, e))?;

        let code = exit_code(status);
        debug!("{} exited with code {}", entry.display(), code);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bootstrap_embeds_json_literals() {
        let script = bootstrap_script(
            Path::new("/opt/it's \"here\"/index.js"),
            &[json!("my-app"), json!({"force": true})],
        )
        .unwrap();

        assert_eq!(
            script,
            r#"const m = require("/opt/it's \"here\"/index.js"); (typeof m === 'function' ? m : m.default).call(null, ["my-app",{"force":true}])"#
        );
    }

    #[cfg(unix)]
    fn fake_interpreter(dir: &Path, code: i32) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(format!("interp-{code}"));
        std::fs::write(&path, format!("#!/bin/sh\nexit {code}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_codes_pass_through() {
        let dir = tempfile::TempDir::new().unwrap();
        for code in [0, 1, 127] {
            let launcher = NodeLauncher::new(fake_interpreter(dir.path(), code));
            let observed = launcher
                .launch(Path::new("/nowhere/index.js"), &[json!({})])
                .await
                .unwrap();
            assert_eq!(observed, code);
        }
    }

    #[cfg(unix)]
    #[test]
    fn signal_maps_above_128() {
        let status = std::process::Command::new("sh")
            .args(["-c", "kill -9 $$"])
            .status()
            .unwrap();
        assert_eq!(exit_code(status), 137);
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_error() {
        let launcher = NodeLauncher::new("/nonexistent/fancy-interpreter");
        let err = launcher
            .launch(Path::new("/nowhere/index.js"), &[json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, FancyError::Spawn { .. }));
    }
}

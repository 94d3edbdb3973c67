//! Command dispatch
//!
//! Maps a command name to its package, makes sure the package is on disk
//! and current, then runs its entry file in a separate process.

pub mod invocation;
pub mod launcher;

pub use invocation::{InvocationContext, InvocationOptions};
pub use launcher::{Launcher, NodeLauncher};

use crate::config::Settings;
use crate::error::{FancyError, FancyResult};
use crate::package::{PackageCache, PackageSpec, LATEST};
use crate::registry::RegistryClient;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns commands into child processes
pub struct Dispatcher<'a> {
    settings: &'a Settings,
    registry: &'a dyn RegistryClient,
    launcher: &'a dyn Launcher,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        settings: &'a Settings,
        registry: &'a dyn RegistryClient,
        launcher: &'a dyn Launcher,
    ) -> Self {
        Self {
            settings,
            registry,
            launcher,
        }
    }

    /// Package backing `command`
    pub fn package_for(&self, command: &str) -> FancyResult<&'a str> {
        self.settings
            .commands
            .package_for(command)
            .ok_or_else(|| FancyError::UnknownCommand(command.to_string()))
    }

    /// Package cache for `command`: the target path override if set, else the shared cache
    pub fn package_cache(&self, command: &str) -> FancyResult<PackageCache<'a>> {
        let package = self.package_for(command)?;

        let spec = match &self.settings.target_path {
            Some(target) => {
                debug!("Using local module at {}", target.display());
                PackageSpec::direct(package, target.clone())?
            }
            None => {
                let target = self.settings.dependencies_dir();
                let store = self.settings.store_dir();
                debug!("Cache target {}, store {}", target.display(), store.display());
                PackageSpec::namespaced(package, LATEST, target, store)?
            }
        };
        Ok(PackageCache::new(spec, self.registry))
    }

    /// Make the command's package available and return its entry file
    ///
    /// `None` means the package declares nothing to run.
    pub async fn prepare(&self, command: &str) -> FancyResult<Option<PathBuf>> {
        let mut package = self.package_cache(command)?;

        if package.spec().is_namespaced() {
            if package.exists().await? {
                package.update().await?;
            } else {
                package.install().await?;
            }
            info!("Using {}@{}", package.spec().name, package.version());
        }

        let entry = package.entry_path();
        if entry.is_none() {
            info!("{} has no entry file, nothing to run", package.spec().name);
        }
        Ok(entry)
    }

    /// Run `entry` with the invocation and return the child's exit code
    pub async fn launch(&self, entry: &Path, invocation: &InvocationContext) -> FancyResult<i32> {
        self.launcher.launch(entry, &invocation.call_args()).await
    }

    /// Prepare and launch in one go; a package without entry exits with 0
    pub async fn dispatch(&self, command: &str, invocation: &InvocationContext) -> FancyResult<i32> {
        match self.prepare(command).await? {
            Some(entry) => self.launch(&entry, invocation).await,
            None => Ok(0),
        }
    }
}

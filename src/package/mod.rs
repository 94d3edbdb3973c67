//! Versioned package cache
//!
//! A [`PackageCache`] manages one package on disk. With a store directory the
//! package lives in a version-namespaced entry so several versions coexist:
//!
//! ```text
//! {store_dir}/_{name, '/' -> '_'}@{version}@{name}/
//! ```
//!
//! Without a store directory a [`PackageSpec`] addresses a module already sitting at
//! `target_path` (local development) and no version management happens.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | Uninitialized | `latest` not resolved yet |
//! | VersionResolved | concrete version known, presence not checked |
//! | Missing | cache entry absent |
//! | Present | cache entry on disk |
//!
//! Entries are never removed by this module.

pub mod manifest;

use crate::error::{FancyError, FancyResult, InstallError};
use crate::registry::RegistryClient;
use chrono::{DateTime, Utc};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Version sentinel resolved through the registry on first use
pub const LATEST: &str = "latest";

/// Cache entry directory for `(name, version)` under `store_dir`
pub fn cache_entry_path(store_dir: &Path, name: &str, version: &str) -> PathBuf {
    let prefix = name.replacen('/', "_", 1);
    store_dir.join(format!("_{}@{}@{}", prefix, version, name))
}

/// What to manage: a package, its version and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub target_path: PathBuf,
    pub store_dir: Option<PathBuf>,
}

impl PackageSpec {
    /// A module used in place at `target_path`
    pub fn direct(name: &str, target_path: PathBuf) -> FancyResult<Self> {
        Self::build(name, LATEST, target_path, None)
    }

    /// A version-namespaced entry under `store_dir`
    pub fn namespaced(
        name: &str,
        version: &str,
        target_path: PathBuf,
        store_dir: PathBuf,
    ) -> FancyResult<Self> {
        Self::build(name, version, target_path, Some(store_dir))
    }

    fn build(
        name: &str,
        version: &str,
        target_path: PathBuf,
        store_dir: Option<PathBuf>,
    ) -> FancyResult<Self> {
        if name.trim().is_empty() {
            return Err(FancyError::InvalidSpec("package name is empty".to_string()));
        }
        if version.trim().is_empty() {
            return Err(FancyError::InvalidSpec(format!("{} has an empty version", name)));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            target_path,
            store_dir,
        })
    }

    /// Whether this spec addresses a version-namespaced cache entry
    pub fn is_namespaced(&self) -> bool {
        self.store_dir.is_some()
    }
}

/// Lifecycle of a [`PackageCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    VersionResolved,
    Missing,
    Present,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::VersionResolved => write!(f, "resolved"),
            Self::Missing => write!(f, "missing"),
            Self::Present => write!(f, "present"),
        }
    }
}

/// One package on disk, backed by a registry
pub struct PackageCache<'a> {
    spec: PackageSpec,
    registry: &'a dyn RegistryClient,
    state: CacheState,
}

impl<'a> PackageCache<'a> {
    pub fn new(spec: PackageSpec, registry: &'a dyn RegistryClient) -> Self {
        Self {
            spec,
            registry,
            state: CacheState::Uninitialized,
        }
    }

    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    /// Current version, `latest` until resolved
    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Cache entry for the current version, `None` for direct specs
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.spec
            .store_dir
            .as_deref()
            .map(|store| cache_entry_path(store, &self.spec.name, &self.spec.version))
    }

    /// Whether the package is available on disk
    ///
    /// Namespaced specs resolve `latest` first (once) and create the store
    /// directory if needed. Direct specs only look at `target_path`.
    pub async fn exists(&mut self) -> Result<bool, InstallError> {
        let Some(store) = self.spec.store_dir.clone() else {
            return Ok(self.spec.target_path.exists());
        };

        self.prepare().await?;
        let present = cache_entry_path(&store, &self.spec.name, &self.spec.version).exists();
        self.state = if present {
            CacheState::Present
        } else {
            CacheState::Missing
        };
        debug!("{}@{} is {}", self.spec.name, self.spec.version, self.state);
        Ok(present)
    }

    /// Fetch the current version into the cache
    pub async fn install(&mut self) -> Result<(), InstallError> {
        let store = self.managed_store()?;
        self.prepare().await?;

        self.registry
            .fetch(&self.spec.name, &self.spec.version, &self.spec.target_path, &store)
            .await?;
        self.state = CacheState::Present;
        Ok(())
    }

    /// Move to the registry's latest version, fetching it only if it is not cached
    ///
    /// The current version is replaced by the latest one even when it was
    /// pinned, unless the pinned version is newer than what the registry
    /// calls latest.
    pub async fn update(&mut self) -> Result<(), InstallError> {
        let store = self.managed_store()?;
        self.prepare().await?;

        let latest = self.resolve_latest().await?;
        if is_older(&latest, &self.spec.version) {
            debug!(
                "Registry latest {} is older than {}, keeping it",
                latest, self.spec.version
            );
            return Ok(());
        }

        let latest_path = cache_entry_path(&store, &self.spec.name, &latest);
        if latest_path.exists() {
            debug!("{}@{} already cached", self.spec.name, latest);
        } else {
            self.registry
                .fetch(&self.spec.name, &latest, &self.spec.target_path, &store)
                .await?;
        }

        self.spec.version = latest;
        self.state = CacheState::Present;
        Ok(())
    }

    /// Absolute entry file of the module, `None` when there is nothing to run
    pub fn entry_path(&self) -> Option<PathBuf> {
        let root = match self.cache_path() {
            Some(path) => path,
            None => self.spec.target_path.clone(),
        };
        manifest::resolve_entry(&root)
    }

    fn managed_store(&self) -> Result<PathBuf, InstallError> {
        self.spec
            .store_dir
            .clone()
            .ok_or_else(|| InstallError::Unmanaged {
                path: self.spec.target_path.clone(),
            })
    }

    async fn prepare(&mut self) -> Result<(), InstallError> {
        if let Some(store) = &self.spec.store_dir {
            if !store.exists() {
                fs::create_dir_all(store)
                    .await
                    .map_err(|e| InstallError::io(format!("creating {}", store.display()), e))?;
            }
        }

        if self.spec.version == LATEST {
            self.spec.version = self.resolve_latest().await?;
        }
        if self.state == CacheState::Uninitialized {
            self.state = CacheState::VersionResolved;
        }
        Ok(())
    }

    async fn resolve_latest(&self) -> Result<String, InstallError> {
        self.registry
            .latest_version(&self.spec.name)
            .await?
            .ok_or_else(|| InstallError::NoLatestVersion {
                package: self.spec.name.clone(),
            })
    }
}

fn is_older(candidate: &str, current: &str) -> bool {
    match (Version::parse(candidate), Version::parse(current)) {
        (Ok(candidate), Ok(current)) => candidate < current,
        _ => false,
    }
}

/// A cached package found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

/// List the cache entries under `store_dir`, sorted by name then version
pub async fn list_entries(store_dir: &Path) -> FancyResult<Vec<CacheEntry>> {
    let mut entries = Vec::new();
    if !store_dir.exists() {
        return Ok(entries);
    }

    let mut read = fs::read_dir(store_dir)
        .await
        .map_err(|e| FancyError::io(format!("reading {}", store_dir.display()), e))?;

    while let Some(dir) = read
        .next_entry()
        .await
        .map_err(|e| FancyError::io(format!("reading {}", store_dir.display()), e))?
    {
        let dir_name = dir.file_name().to_string_lossy().into_owned();
        if !dir_name.starts_with('_') || !dir.path().is_dir() {
            continue;
        }

        let last = dir_name.rsplit('@').next().unwrap_or_default();
        if dir_name.ends_with(&format!("@@{}", last)) {
            // scoped: `_@scope_pkg@1.0.0@@scope/pkg`
            let mut children = fs::read_dir(dir.path())
                .await
                .map_err(|e| FancyError::io(format!("reading {}", dir.path().display()), e))?;
            while let Some(child) = children
                .next_entry()
                .await
                .map_err(|e| FancyError::io(format!("reading {}", dir.path().display()), e))?
            {
                let name = format!("@{}/{}", last, child.file_name().to_string_lossy());
                entries.extend(parse_entry(store_dir, &dir_name, &name).await);
            }
        } else {
            entries.extend(parse_entry(store_dir, &dir_name, last).await);
        }
    }

    entries.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| compare_versions(&a.version, &b.version))
    });
    Ok(entries)
}

/// Recover `(name, version)` from an entry directory name, checking it round-trips
async fn parse_entry(store_dir: &Path, dir_name: &str, name: &str) -> Option<CacheEntry> {
    let prefix = format!("_{}@", name.replacen('/', "_", 1));
    let suffix = format!("@{}", name.split('/').next().unwrap_or(name));

    let version = dir_name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
    if version.is_empty() {
        return None;
    }

    let path = cache_entry_path(store_dir, name, version);
    let metadata = fs::metadata(&path).await.ok().filter(|m| m.is_dir())?;
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

    Some(CacheEntry {
        name: name.to_string(),
        version: version.to_string(),
        path,
        modified,
    })
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

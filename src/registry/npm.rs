//! npm registry client
//!
//! Reads the abbreviated packument (`application/vnd.npm.install-v1+json`)
//! and downloads tarballs. Downloads are staged in a temporary directory
//! inside the store and renamed into place, so a concurrent invocation never
//! observes a half-extracted entry.

use crate::config::RegistryConfig;
use crate::error::InstallError;
use crate::package::cache_entry_path;
use crate::registry::RegistryClient;
use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use flate2::read::GzDecoder;
use semver::Version;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

const PACKUMENT_ACCEPT: &str = "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8";
const PACKUMENT_LIMIT: u64 = 64 * 1024 * 1024;
const TARBALL_LIMIT: u64 = 256 * 1024 * 1024;

/// Subset of a packument needed to resolve and download a version
#[derive(Debug, Default, Deserialize)]
pub struct Packument {
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,
}

/// One published version
#[derive(Debug, Default, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Download location and checksums of a version
#[derive(Debug, Deserialize)]
pub struct Dist {
    pub tarball: String,

    #[serde(default)]
    pub integrity: Option<String>,
}

impl Packument {
    /// The `latest` dist-tag, or the highest semver version when the tag is missing
    pub fn latest(&self) -> Option<String> {
        if let Some(tagged) = self.dist_tags.get("latest") {
            return Some(tagged.clone());
        }

        self.versions
            .keys()
            .filter_map(|v| Version::parse(v).ok())
            .max()
            .map(|v| v.to_string())
    }
}

/// Registry client for npm-compatible registries
#[derive(Clone)]
pub struct NpmRegistry {
    agent: Agent,
    base_url: String,
}

impl NpmRegistry {
    /// Create a client from the registry settings
    pub fn new(config: &RegistryConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: config.url.trim_end_matches('/').to_string(),
        }
    }

    /// Packument URL; the scope separator is percent-encoded
    pub fn packument_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.replace('/', "%2F"))
    }

    fn get_packument(&self, name: &str) -> Result<Option<Packument>, InstallError> {
        let url = self.packument_url(name);
        debug!("GET {}", url);

        let mut response = match self.agent.get(&url).header("Accept", PACKUMENT_ACCEPT).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(e) => return Err(map_http_error(name, "latest", e)),
        };

        let body = response
            .body_mut()
            .with_config()
            .limit(PACKUMENT_LIMIT)
            .read_to_string()
            .map_err(|e| map_http_error(name, "latest", e))?;

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| InstallError::fetch_failed(name, "latest", format!("invalid packument: {e}")))
    }

    fn download(&self, name: &str, version: &str, url: &str) -> Result<Vec<u8>, InstallError> {
        debug!("Downloading {}", url);
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_http_error(name, version, e))?;

        response
            .body_mut()
            .with_config()
            .limit(TARBALL_LIMIT)
            .read_to_vec()
            .map_err(|e| map_http_error(name, version, e))
    }

    fn fetch_blocking(
        &self,
        name: &str,
        version: &str,
        target_root: &Path,
        store_dir: &Path,
    ) -> Result<(), InstallError> {
        let packument = self.get_packument(name)?.ok_or_else(|| InstallError::VersionNotFound {
            package: name.to_string(),
            version: version.to_string(),
        })?;

        let dist = packument
            .versions
            .get(version)
            .and_then(|manifest| manifest.dist.as_ref())
            .ok_or_else(|| InstallError::VersionNotFound {
                package: name.to_string(),
                version: version.to_string(),
            })?;

        let bytes = self.download(name, version, &dist.tarball)?;
        if !verify_integrity(&bytes, dist.integrity.as_deref()) {
            return Err(InstallError::Integrity {
                package: name.to_string(),
                version: version.to_string(),
            });
        }

        let entry = cache_entry_path(store_dir, name, version);
        install_into_store(&bytes, store_dir, &entry)?;
        link_current(&entry, &target_root.join("node_modules").join(name));

        info!("Installed {}@{} into {}", name, version, entry.display());
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for NpmRegistry {
    async fn latest_version(&self, name: &str) -> Result<Option<String>, InstallError> {
        let client = self.clone();
        let package = name.to_string();

        let packument = tokio::task::spawn_blocking(move || client.get_packument(&package))
            .await
            .map_err(|e| InstallError::fetch_failed(name, "latest", e))??;

        let latest = packument.and_then(|p| p.latest());
        debug!("Latest version of {}: {:?}", name, latest);
        Ok(latest)
    }

    async fn fetch(
        &self,
        name: &str,
        version: &str,
        target_root: &Path,
        store_dir: &Path,
    ) -> Result<(), InstallError> {
        let client = self.clone();
        let (package, pinned) = (name.to_string(), version.to_string());
        let (target_root, store_dir) = (target_root.to_path_buf(), store_dir.to_path_buf());

        tokio::task::spawn_blocking(move || {
            client.fetch_blocking(&package, &pinned, &target_root, &store_dir)
        })
        .await
        .map_err(|e| InstallError::fetch_failed(name, version, e))?
    }
}

fn map_http_error(name: &str, version: &str, err: ureq::Error) -> InstallError {
    match err {
        ureq::Error::Timeout(_) => InstallError::Timeout {
            package: name.to_string(),
        },
        other => InstallError::fetch_failed(name, version, other),
    }
}

/// Check a tarball against an SRI string; only `sha512-` hashes are verified
pub fn verify_integrity(bytes: &[u8], integrity: Option<&str>) -> bool {
    let Some(expected) = integrity
        .into_iter()
        .flat_map(str::split_whitespace)
        .find_map(|part| part.strip_prefix("sha512-"))
    else {
        debug!("No sha512 integrity published, skipping verification");
        return true;
    };

    let digest = Sha512::digest(bytes);
    debug!("Tarball sha512 {}", hex::encode(&digest[..6]));
    BASE64_STANDARD.encode(digest) == expected
}

/// Unpack a package tarball into `dest`, dropping the leading `package/` component
pub fn unpack_tarball(bytes: &[u8], dest: &Path) -> io::Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));

    for entry in archive.entries()? {
        let mut entry = entry?;
        match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Directory => {}
            other => {
                debug!("Skipping tar entry of type {:?}", other);
                continue;
            }
        }

        let path = entry.path()?.into_owned();
        let mut relative = PathBuf::new();
        for component in path.components().skip(1) {
            match component {
                Component::Normal(part) => relative.push(part),
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unsafe path in tarball: {}", path.display()),
                    ))
                }
            }
        }
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }
    Ok(())
}

/// Extract into a staging directory and atomically move it to `entry`
fn install_into_store(bytes: &[u8], store_dir: &Path, entry: &Path) -> Result<(), InstallError> {
    fs::create_dir_all(store_dir)
        .map_err(|e| InstallError::io(format!("creating {}", store_dir.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(store_dir)
        .map_err(|e| InstallError::io("creating staging directory", e))?;

    unpack_tarball(bytes, staging.path())
        .map_err(|e| InstallError::io(format!("unpacking into {}", staging.path().display()), e))?;

    if let Some(parent) = entry.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| InstallError::io(format!("creating {}", parent.display()), e))?;
    }

    match fs::rename(staging.path(), entry) {
        Ok(()) => Ok(()),
        Err(_) if entry.exists() => {
            debug!("{} appeared concurrently, keeping it", entry.display());
            Ok(())
        }
        Err(e) => Err(InstallError::io(
            format!("moving package into {}", entry.display()),
            e,
        )),
    }
}

/// Point `{target_root}/node_modules/{name}` at the fetched entry
#[cfg(unix)]
fn link_current(entry: &Path, link: &Path) {
    if let Ok(meta) = fs::symlink_metadata(link) {
        if !meta.file_type().is_symlink() {
            debug!("{} is not a link, leaving it alone", link.display());
            return;
        }
        if let Err(e) = fs::remove_file(link) {
            warn!("Could not replace link {}: {}", link.display(), e);
            return;
        }
    }
    if let Some(parent) = link.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    if let Err(e) = std::os::unix::fs::symlink(entry, link) {
        warn!("Could not link {} to {}: {}", link.display(), entry.display(), e);
    }
}

#[cfg(not(unix))]
fn link_current(_entry: &Path, _link: &Path) {}

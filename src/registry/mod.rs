//! Package registry abstraction
//!
//! The package cache only needs two things from a registry: the latest
//! published version of a package, and a way to materialize a given
//! version into the cache.

pub mod npm;

pub use npm::NpmRegistry;

use crate::error::InstallError;
use async_trait::async_trait;
use std::path::Path;

/// Abstract registry interface
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Latest published version of `name`, `None` if the registry does not know it
    async fn latest_version(&self, name: &str) -> Result<Option<String>, InstallError>;

    /// Fetch `name@version` into its cache entry under `store_dir`
    ///
    /// `target_root` is the directory the store belongs to; its
    /// `node_modules/{name}` link is pointed at the fetched entry.
    async fn fetch(
        &self,
        name: &str,
        version: &str,
        target_root: &Path,
        store_dir: &Path,
    ) -> Result<(), InstallError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::package::cache_entry_path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory registry that materializes packages as a bare `package.json`
    pub(crate) struct FakeRegistry {
        latest: Mutex<Option<String>>,
        fetched: Mutex<Vec<(String, String)>>,
        latest_calls: AtomicUsize,
        fail_fetch: bool,
    }

    impl FakeRegistry {
        pub(crate) fn with_latest(version: &str) -> Self {
            Self {
                latest: Mutex::new(Some(version.to_string())),
                fetched: Mutex::new(Vec::new()),
                latest_calls: AtomicUsize::new(0),
                fail_fetch: false,
            }
        }

        pub(crate) fn unknown() -> Self {
            Self {
                latest: Mutex::new(None),
                ..Self::with_latest("0.0.0")
            }
        }

        pub(crate) fn failing(version: &str) -> Self {
            Self {
                fail_fetch: true,
                ..Self::with_latest(version)
            }
        }

        pub(crate) fn publish(&self, version: &str) {
            *self.latest.lock().unwrap() = Some(version.to_string());
        }

        pub(crate) fn fetched(&self) -> Vec<(String, String)> {
            self.fetched.lock().unwrap().clone()
        }

        pub(crate) fn latest_calls(&self) -> usize {
            self.latest_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn latest_version(&self, _name: &str) -> Result<Option<String>, InstallError> {
            self.latest_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.latest.lock().unwrap().clone())
        }

        async fn fetch(
            &self,
            name: &str,
            version: &str,
            _target_root: &Path,
            store_dir: &Path,
        ) -> Result<(), InstallError> {
            if self.fail_fetch {
                return Err(InstallError::fetch_failed(name, version, "registry unreachable"));
            }
            let entry = cache_entry_path(store_dir, name, version);
            std::fs::create_dir_all(entry.join("lib")).unwrap();
            std::fs::write(entry.join("package.json"), r#"{"main": "lib/index.js"}"#).unwrap();
            self.fetched
                .lock()
                .unwrap()
                .push((name.to_string(), version.to_string()));
            Ok(())
        }
    }
}

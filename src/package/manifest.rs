//! Entry point resolution from `package.json`

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Metadata file marking a module root
pub const MANIFEST_FILE: &str = "package.json";

/// The part of `package.json` the dispatcher cares about
#[derive(Debug, Deserialize)]
pub struct EntryDescriptor {
    #[serde(default)]
    pub main: Option<String>,
}

/// Nearest directory at or above `start` that contains a `package.json`
pub fn find_package_root(start: &Path) -> Option<PathBuf> {
    if !start.is_dir() {
        return None;
    }
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Read the entry descriptor of a module root
pub fn read_descriptor(root: &Path) -> Option<EntryDescriptor> {
    let path = root.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(descriptor) => Some(descriptor),
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

/// Absolute entry path of the module at or above `start`, separators normalized to `/`
pub fn resolve_entry(start: &Path) -> Option<PathBuf> {
    let root = find_package_root(start)?;
    let main = read_descriptor(&root)?.main.filter(|m| !m.trim().is_empty())?;

    let root = std::path::absolute(&root).unwrap_or(root);
    let resolved = normalize_lexically(&root.join(main));
    Some(PathBuf::from(to_forward_slashes(&resolved)))
}

/// Drop `.` components and fold `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Render a path with `/` as the only separator
pub fn to_forward_slashes(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace('\\', "/")
    }
}

// src/system/parameter_store.rs

//! Access to the remote key-value store holding organization-wide defaults.
//!
//! The loader only needs `get(key)`, so the store is a narrow trait. Two
//! implementations are provided: an in-memory map and a directory tree where every
//! key is a file path below a root directory.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached at all.
    #[error("Parameter store is unavailable: {reason}")]
    Unavailable { reason: String },
    /// A key exists but could not be read.
    #[error("Could not read parameter '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A key-value store queried with fully qualified keys such as `/default/tgf/docker-image`.
pub trait ParameterStore: std::fmt::Debug {
    /// Returns the value stored under `key`, or `None` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// A store backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ParameterStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }
}

/// A store where `/a/b/c` is the content of the file `<root>/a/b/c`.
///
/// This is the layout produced by mounting a key-value tree (config maps, synced
/// parameter exports) on disk. A missing root directory makes the store unavailable.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ParameterStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable {
                reason: format!("'{}' is not a directory", self.root.display()),
            });
        }

        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content.trim_end_matches(['\n', '\r']).to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // A directory at the key path is a namespace, not a value.
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(StoreError::Read {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_insert_replaces() {
        let mut store = MemoryStore::new();
        store.insert("/default/tgf/logging-level", "info");
        store.insert("/default/tgf/logging-level", "debug");
        assert_eq!(
            store.get("/default/tgf/logging-level").unwrap().as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn test_memory_store() {
        let store: MemoryStore = [("/default/tgf/docker-image", "org/image")]
            .into_iter()
            .collect();
        assert_eq!(
            store.get("/default/tgf/docker-image").unwrap().as_deref(),
            Some("org/image")
        );
        assert_eq!(store.get("/default/tgf/alias").unwrap(), None);
    }

    #[test]
    fn test_directory_store_reads_files_under_root() {
        let dir = tempdir().unwrap();
        let leaf = dir.path().join("default").join("tgf");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("docker-image"), "org/image\n").unwrap();

        let store = DirectoryStore::new(dir.path());
        assert_eq!(
            store.get("/default/tgf/docker-image").unwrap().as_deref(),
            Some("org/image")
        );
        assert_eq!(store.get("/default/tgf/docker-refresh").unwrap(), None);
        assert_eq!(store.get("/default/tgf").unwrap(), None);
        // Parent components cannot escape the root.
        assert_eq!(store.get("/../default/tgf/docker-image").unwrap().as_deref(), Some("org/image"));
    }

    #[test]
    fn test_directory_store_missing_root_is_unavailable() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("missing"));
        assert!(matches!(
            store.get("/default/tgf/docker-image"),
            Err(StoreError::Unavailable { .. })
        ));
    }
}

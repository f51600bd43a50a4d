// src/core/refresh_gate.rs

//! Per-image refresh markers.
//!
//! Each image reference owns a marker file whose modification time records the last
//! refresh. An image is due when its marker is missing or older than the interval.

use crate::core::commons;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

const MARKER_HASH_BYTES: usize = 16;

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Could not read refresh marker '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write refresh marker '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RefreshResult<T> = Result<T, RefreshError>;

/// Decides whether an image should be pulled again, based on marker files in one directory.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    markers_dir: PathBuf,
}

impl RefreshGate {
    pub fn new(markers_dir: impl Into<PathBuf>) -> Self {
        Self {
            markers_dir: markers_dir.into(),
        }
    }

    /// The marker file for `image`. Distinct references map to distinct markers.
    pub fn marker_path(&self, image: &str) -> PathBuf {
        self.markers_dir
            .join(commons::short_hash(image.as_bytes(), MARKER_HASH_BYTES))
    }

    /// `true` when `image` has never been refreshed or its last refresh is older than `interval`.
    ///
    /// A marker dated in the future counts as fresh.
    pub fn is_due(&self, image: &str, interval: Duration) -> RefreshResult<bool> {
        let path = self.marker_path(image);
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No refresh marker for '{}'.", image);
                return Ok(true);
            }
            Err(e) => return Err(RefreshError::Read { path, source: e }),
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        log::debug!(
            "Image '{}' was last refreshed {}s ago (interval {}s).",
            image,
            age.as_secs(),
            interval.as_secs()
        );
        Ok(age > interval)
    }

    /// Records that `image` has just been refreshed.
    ///
    /// Two runs creating the same marker at once both succeed; the later timestamp wins.
    pub fn touch(&self, image: &str) -> RefreshResult<()> {
        fs::create_dir_all(&self.markers_dir).map_err(|e| RefreshError::Write {
            path: self.markers_dir.clone(),
            source: e,
        })?;
        let path = self.marker_path(image);
        let file = open_marker(&path)?;
        file.set_modified(SystemTime::now())
            .map_err(|e| RefreshError::Write { path, source: e })
    }
}

fn open_marker(path: &Path) -> RefreshResult<File> {
    let to_write_error = |e: std::io::Error| RefreshError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            OpenOptions::new().write(true).open(path).map_err(to_write_error)
        }
        Err(e) => Err(to_write_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_missing_marker_is_due() {
        let dir = tempdir().unwrap();
        let gate = RefreshGate::new(dir.path().join("refresh"));
        assert!(gate.is_due("org/tgf:1.0.0", HOUR).unwrap());
    }

    #[test]
    fn test_touched_marker_is_fresh() {
        let dir = tempdir().unwrap();
        let gate = RefreshGate::new(dir.path().join("refresh"));

        gate.touch("org/tgf:1.0.0").unwrap();

        assert!(!gate.is_due("org/tgf:1.0.0", HOUR).unwrap());
        assert!(gate.is_due("org/tgf:1.0.1", HOUR).unwrap());
        // Touching again is fine.
        gate.touch("org/tgf:1.0.0").unwrap();
    }

    #[test]
    fn test_old_marker_is_due() {
        let dir = tempdir().unwrap();
        let gate = RefreshGate::new(dir.path());
        let image = "org/tgf:1.0.0";

        gate.touch(image).unwrap();
        let two_hours_ago = SystemTime::now() - 2 * HOUR;
        open_marker(&gate.marker_path(image))
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        assert!(gate.is_due(image, HOUR).unwrap());
        assert!(!gate.is_due(image, 3 * HOUR).unwrap());
    }

    #[test]
    fn test_marker_names_are_distinct() {
        let gate = RefreshGate::new("/cache");
        assert_ne!(gate.marker_path("a:1"), gate.marker_path("a:2"));
        assert_eq!(
            gate.marker_path("a:1").file_name().unwrap().len(),
            MARKER_HASH_BYTES * 2
        );
    }
}

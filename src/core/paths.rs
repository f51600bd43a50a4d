// src/core/paths.rs

use crate::constants::{REFRESH_MARKERS_DIR, TGF_DIR, USER_CONFIG_FILENAME};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not find system cache directory.")]
    CacheDirNotFound,
}

/// Returns the path to the tgf configuration directory (`~/.config/tgf`).
pub fn get_tgf_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(TGF_DIR))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the default location of the user overlay file.
pub fn get_user_config_path() -> Result<PathBuf, PathError> {
    get_tgf_config_dir().map(|dir| dir.join(USER_CONFIG_FILENAME))
}

/// Returns the directory holding the refresh markers (`~/.cache/tgf/refresh`).
/// The directory is not created here; the refresh gate creates it on first touch.
pub fn get_refresh_markers_dir() -> Result<PathBuf, PathError> {
    dirs::cache_dir()
        .map(|dir| dir.join(TGF_DIR).join(REFRESH_MARKERS_DIR))
        .ok_or(PathError::CacheDirNotFound)
}

/// Resolves a configured folder to an absolute path.
///
/// A leading `~` is expanded to the home directory; a path that is still relative is
/// taken relative to `base` (the directory of the source that configured it).
/// Environment variables are not expanded, so `$` is an ordinary character.
pub fn resolve_folder(raw: &str, base: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());
    let absolute = if path.is_absolute() {
        path
    } else {
        base.join(path)
    };
    normalize(&absolute)
}

/// Removes `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

//! # Config Loader
//!
//! This module provides the `ConfigLoader` struct, which discovers and merges every
//! configuration layer that applies to a working directory:
//!
//! 1. **Project files:** every `.tgf.config` found walking from the start directory up
//!    to the filesystem root, nearest first.
//! 2. **User overlay:** an optional per-user file, consulted after all project files.
//! 3. **Remote store:** organization-wide defaults read from a key-value store under a
//!    configurable root path, consulted last.
//!
//! Layers are combined with a fill-gap merge: a value set by a nearer layer is never
//! replaced by a farther one. Build configs are the exception: they are appended in
//! layer order so that the image tag derived from them stays deterministic.
//!
//! A malformed local file aborts the load. An unavailable store only produces a warning.
use crate::{
    constants::{
        DEFAULT_STORE_ROOT, KEY_ALIAS, KEY_IMAGE, KEY_IMAGE_BUILD, KEY_IMAGE_BUILD_FOLDER,
        KEY_IMAGE_BUILD_TAG, KEY_LOGGING_LEVEL, KEY_REFRESH, PROJECT_CONFIG_FILENAME,
    },
    core::{commons, paths, version},
    models::{ConfigDocument, ConfigSource, ImageBuildConfig, ResolvedConfig},
    system::parameter_store::{ParameterStore, StoreError},
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not resolve start directory '{path}': {source}")]
    StartDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not read configuration file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed configuration file '{path}': {reason}")]
    MalformedConfigFile { path: String, reason: String },
}

type ConfigResult<T> = Result<T, ConfigError>;

/// Which optional layers to consult, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Location of the user overlay. `None` means there is no overlay to read.
    pub user_config: Option<PathBuf>,
    pub ignore_user_config: bool,
    /// Root path of the remote keys, e.g. `/default/tgf`.
    pub store_root: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            user_config: None,
            ignore_user_config: false,
            store_root: DEFAULT_STORE_ROOT.to_string(),
        }
    }
}

/// Orchestrates the loading of configuration layers for a working directory.
#[derive(Debug)]
pub struct ConfigLoader<'a> {
    options: LoadOptions,
    store: Option<&'a dyn ParameterStore>,
}

impl<'a> ConfigLoader<'a> {
    /// Creates a new `ConfigLoader`.
    ///
    /// # Arguments
    ///
    /// * `options` - Which optional layers to consult.
    /// * `store` - The remote store, or `None` to skip the remote layer.
    pub fn new(options: LoadOptions, store: Option<&'a dyn ParameterStore>) -> Self {
        Self { options, store }
    }

    /// Resolves the configuration that applies to `start_dir`.
    ///
    /// # Errors
    ///
    /// Fails when the start directory does not exist, or when a project file or the
    /// user overlay cannot be read or parsed. Store failures are logged and skipped.
    pub fn load(&self, start_dir: &Path) -> ConfigResult<ResolvedConfig> {
        let start_dir = dunce::canonicalize(start_dir).map_err(|e| ConfigError::StartDir {
            path: start_dir.display().to_string(),
            source: e,
        })?;
        log::debug!("ConfigLoader resolving from: {}", start_dir.display());

        let mut resolved = ResolvedConfig::default();

        // --- 1. Project files, nearest first ---
        for dir in start_dir.ancestors() {
            let path = dir.join(PROJECT_CONFIG_FILENAME);
            if !path.is_file() {
                continue;
            }
            log::debug!("Merging project file: {}", path.display());
            let layer = read_file_layer(&path, ConfigSource::ProjectFile(path.clone()))?;
            resolved.fill_gaps(layer);
        }

        // --- 2. User overlay ---
        if self.options.ignore_user_config {
            log::debug!("User overlay ignored on request.");
        } else if let Some(path) = self.options.user_config.as_deref().filter(|p| p.is_file()) {
            log::debug!("Merging user overlay: {}", path.display());
            let layer = read_file_layer(path, ConfigSource::UserConfig(path.to_path_buf()))?;
            resolved.fill_gaps(layer);
        }

        // --- 3. Remote store ---
        if let Some(store) = self.store {
            match self.read_remote_layer(store, &start_dir) {
                Ok(layer) => resolved.fill_gaps(layer),
                Err(e) => log::warn!(
                    "Remote configuration skipped, falling back to local values and defaults: {}",
                    e
                ),
            }
        }

        promote_partial_version(&mut resolved);
        Ok(resolved)
    }

    /// Reads the well-known keys under the store root into a layer.
    ///
    /// Values that cannot be interpreted are warned about and ignored; only a store
    /// failure aborts the layer.
    fn read_remote_layer(
        &self,
        store: &dyn ParameterStore,
        start_dir: &Path,
    ) -> Result<ResolvedConfig, StoreError> {
        let root = self.options.store_root.trim_matches('/');
        let get = |leaf: &str| -> Result<Option<String>, StoreError> {
            let key = if root.is_empty() {
                format!("/{}", leaf)
            } else {
                format!("/{}/{}", root, leaf)
            };
            let value = store.get(&key)?;
            if value.is_some() {
                log::debug!("Found remote parameter '{}'", key);
            }
            Ok(value)
        };

        let mut layer = ResolvedConfig {
            image: get(KEY_IMAGE)?,
            log_level: get(KEY_LOGGING_LEVEL)?,
            ..Default::default()
        };

        if let Some(raw) = get(KEY_REFRESH)? {
            match commons::parse_duration(&raw) {
                Some(interval) => layer.refresh_interval = Some(interval),
                None => log::warn!("Ignoring remote '{}': invalid duration '{}'", KEY_REFRESH, raw),
            }
        }

        if let Some(raw) = get(KEY_ALIAS)? {
            match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(aliases) => layer.aliases = aliases,
                Err(e) => log::warn!("Ignoring remote '{}': {}", KEY_ALIAS, e),
            }
        }

        // Build entries: `docker-image-build`, then `docker-image-build-1`, `-2`, ...
        for index in 0usize.. {
            let suffix = if index == 0 {
                String::new()
            } else {
                format!("-{}", index)
            };
            let instructions = get(&format!("{}{}", KEY_IMAGE_BUILD, suffix))?;
            let folder = get(&format!("{}{}", KEY_IMAGE_BUILD_FOLDER, suffix))?;
            if instructions.is_none() && folder.is_none() {
                break;
            }
            let tag = get(&format!("{}{}", KEY_IMAGE_BUILD_TAG, suffix))?;

            layer.build_configs.extend(build_config(
                instructions,
                folder,
                tag,
                ConfigSource::RemoteStore,
                start_dir,
            ));
        }

        Ok(layer)
    }
}

/// Parses a configuration document. A document whose first non-blank character is
/// `{` is JSON; anything else is TOML.
pub fn parse_document(content: &str) -> Result<ConfigDocument, String> {
    if content.trim_start().starts_with('{') {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

fn read_file_layer(path: &Path, source: ConfigSource) -> ConfigResult<ResolvedConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        source: e,
    })?;
    let malformed = |reason: String| ConfigError::MalformedConfigFile {
        path: path.display().to_string(),
        reason,
    };

    let document = parse_document(&content).map_err(malformed)?;
    if !document.unrecognized.is_empty() {
        let mut keys: Vec<&str> = document.unrecognized.keys().map(String::as_str).collect();
        keys.sort_unstable();
        log::warn!("Ignoring unknown keys in {}: {}", path.display(), keys.join(", "));
    }
    let base = path.parent().unwrap_or_else(|| Path::new("/"));

    let refresh_interval = match document.docker_refresh {
        Some(raw) => Some(
            commons::parse_duration(&raw)
                .ok_or_else(|| malformed(format!("invalid docker-refresh duration '{}'", raw)))?,
        ),
        None => None,
    };
    let build = build_config(
        document.docker_image_build,
        document.docker_image_build_folder,
        document.docker_image_build_tag,
        source,
        base,
    );

    Ok(ResolvedConfig {
        image: document.docker_image,
        image_version: document.docker_image_version,
        image_tag: document.docker_image_tag,
        required_version_range: document.required_image_version,
        recommended_version: document.recommended_image_version,
        log_level: document.logging_level,
        refresh_interval,
        aliases: document.alias,
        build_configs: build.into_iter().collect(),
    })
}

/// Assembles a build config from its three keys. A tag alone does not make a build.
fn build_config(
    instructions: Option<String>,
    folder: Option<String>,
    tag: Option<String>,
    source: ConfigSource,
    base: &Path,
) -> Option<ImageBuildConfig> {
    if instructions.is_none() && folder.is_none() {
        if tag.is_some() {
            log::debug!("Build tag without instructions or folder in {} ignored.", source);
        }
        return None;
    }

    let folder = folder.map(|raw| paths::resolve_folder(&raw, base));
    let tag = tag
        .map(|raw| commons::sanitize_tag(&raw))
        .filter(|t| !t.is_empty());

    Some(ImageBuildConfig {
        instructions: instructions.unwrap_or_default(),
        folder,
        tag,
        source,
    })
}

/// A `docker-image-version` holding a wildcard or an operator is a requirement rather
/// than a tag: move it to the required range so the concrete version is looked up.
fn promote_partial_version(config: &mut ResolvedConfig) {
    if let Some(partial) = config
        .image_version
        .take_if(|v| version::is_partial(v.as_str()))
    {
        log::debug!("Image version '{}' is partial, resolving dynamically.", partial);
        if config.required_version_range.is_none() {
            config.required_version_range = Some(partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::parameter_store::MemoryStore;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    /// A store that is never reachable.
    #[derive(Debug)]
    struct DownStore;

    impl ParameterStore for DownStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable {
                reason: "network unreachable".to_string(),
            })
        }
    }

    /// Creates `<tmp>/a/b` with an optional config file at each of `<tmp>`, `a`, `b`.
    fn tree(root_cfg: Option<&str>, mid_cfg: Option<&str>, leaf_cfg: Option<&str>) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let leaf = root.join("a").join("b");
        fs::create_dir_all(&leaf).unwrap();
        for (path, content) in [(root.clone(), root_cfg), (root.join("a"), mid_cfg), (leaf.clone(), leaf_cfg)] {
            if let Some(content) = content {
                fs::write(path.join(PROJECT_CONFIG_FILENAME), content).unwrap();
            }
        }
        (dir, leaf)
    }

    fn load(start: &Path, options: LoadOptions, store: Option<&dyn ParameterStore>) -> ConfigResult<ResolvedConfig> {
        ConfigLoader::new(options, store).load(start)
    }

    #[test]
    fn test_nearest_project_file_wins() {
        let (_dir, leaf) = tree(
            Some("docker-image = \"root/image\"\ndocker-image-tag = \"root-tag\"\nlogging-level = \"debug\""),
            Some("docker-image = \"mid/image\""),
            Some("docker-image-tag = \"leaf-tag\""),
        );

        let config = load(&leaf, LoadOptions::default(), None).unwrap();

        assert_eq!(config.image.as_deref(), Some("mid/image"));
        assert_eq!(config.image_tag.as_deref(), Some("leaf-tag"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_json_and_toml_flavors_merge_identically() {
        let toml = "docker-image = \"org/image\"\ndocker-refresh = \"2h\"\n[alias]\nplan = \"plan -lock=false\"\n";
        let json = r#"{"docker-image": "org/image", "docker-refresh": "2h", "alias": {"plan": "plan -lock=false"}}"#;

        let (_d1, leaf_toml) = tree(None, None, Some(toml));
        let (_d2, leaf_json) = tree(None, None, Some(json));

        let from_toml = load(&leaf_toml, LoadOptions::default(), None).unwrap();
        let from_json = load(&leaf_json, LoadOptions::default(), None).unwrap();

        assert_eq!(from_toml.image, from_json.image);
        assert_eq!(from_toml.aliases, from_json.aliases);
        assert_eq!(from_toml.refresh_interval, Some(Duration::from_secs(7200)));
        assert_eq!(from_toml.refresh_interval, from_json.refresh_interval);
    }

    #[test]
    fn test_malformed_project_file_is_fatal() {
        let (_dir, leaf) = tree(None, Some("docker-image = "), None);
        let err = load(&leaf, LoadOptions::default(), None).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfigFile { .. }));

        let (_dir, leaf) = tree(None, None, Some("docker-image = 42"));
        let err = load(&leaf, LoadOptions::default(), None).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedConfigFile { .. }));
    }

    #[test]
    fn test_keys_of_other_tools_are_ignored() {
        let (_dir, leaf) = tree(
            None,
            None,
            Some("docker-image = \"org/image\"\nentry-point = \"terragrunt\"\nrun-before = [\"echo\"]\n"),
        );
        let config = load(&leaf, LoadOptions::default(), None).unwrap();
        assert_eq!(config.image.as_deref(), Some("org/image"));

        let document = parse_document(r#"{"docker-image": "org/image", "environment": {"A": "1"}}"#).unwrap();
        assert_eq!(document.docker_image.as_deref(), Some("org/image"));
        assert!(document.unrecognized.contains_key("environment"));
    }

    #[test]
    fn test_user_overlay_only_fills_gaps() {
        let (dir, leaf) = tree(None, None, Some("docker-image = \"project/image\""));
        let user = dir.path().join("user.config");
        fs::write(&user, "docker-image = \"user/image\"\ndocker-image-tag = \"user-tag\"").unwrap();

        let options = LoadOptions {
            user_config: Some(user.clone()),
            ..Default::default()
        };
        let config = load(&leaf, options.clone(), None).unwrap();
        assert_eq!(config.image.as_deref(), Some("project/image"));
        assert_eq!(config.image_tag.as_deref(), Some("user-tag"));

        let ignored = LoadOptions {
            ignore_user_config: true,
            ..options
        };
        let config = load(&leaf, ignored, None).unwrap();
        assert_eq!(config.image_tag, None);
    }

    #[test]
    fn test_remote_store_fills_last_and_appends_builds_after_local() {
        let (_dir, leaf) = tree(
            None,
            Some("docker-image-build = \"RUN apk add jq\"\ndocker-image-build-tag = \"jq\""),
            Some("logging-level = \"warn\""),
        );
        let store: MemoryStore = [
            ("/default/tgf/docker-image", "remote/image"),
            ("/default/tgf/logging-level", "trace"),
            ("/default/tgf/docker-refresh", "30m"),
            ("/default/tgf/alias", r#"{"up": "apply -auto-approve"}"#),
            ("/default/tgf/docker-image-build", "RUN echo remote"),
            ("/default/tgf/docker-image-build-tag", "remote one"),
            ("/default/tgf/docker-image-build-folder-1", "/opt/images/base"),
        ]
        .into_iter()
        .collect();

        let config = load(&leaf, LoadOptions::default(), Some(&store)).unwrap();

        assert_eq!(config.image.as_deref(), Some("remote/image"));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(1800)));
        assert_eq!(config.aliases["up"], "apply -auto-approve");

        let tags: Vec<String> = config.build_configs.iter().map(|b| b.signature()).collect();
        assert_eq!(tags, vec!["jq", "remoteone", "base"]);
        assert!(!config.build_configs[0].source.is_remote());
        assert!(config.build_configs[1].source.is_remote());
        assert_eq!(
            config.build_configs[2].folder.as_deref(),
            Some(Path::new("/opt/images/base"))
        );
    }

    #[test]
    fn test_custom_store_root() {
        let (_dir, leaf) = tree(None, None, None);
        let store: MemoryStore = [("/team/infra/docker-image", "team/image")].into_iter().collect();
        let options = LoadOptions {
            store_root: "team/infra/".to_string(),
            ..Default::default()
        };
        let config = load(&leaf, options, Some(&store)).unwrap();
        assert_eq!(config.image.as_deref(), Some("team/image"));
    }

    #[test]
    fn test_unavailable_store_is_not_fatal() {
        let (_dir, leaf) = tree(None, None, Some("docker-image = \"local/image\""));
        let config = load(&leaf, LoadOptions::default(), Some(&DownStore)).unwrap();
        assert_eq!(config.image.as_deref(), Some("local/image"));
        assert_eq!(config.refresh_interval, None);
    }

    #[test]
    fn test_malformed_remote_values_are_ignored() {
        let (_dir, leaf) = tree(None, None, None);
        let store: MemoryStore = [
            ("/default/tgf/docker-refresh", "soon"),
            ("/default/tgf/alias", "not json"),
            ("/default/tgf/docker-image", "remote/image"),
        ]
        .into_iter()
        .collect();
        let config = load(&leaf, LoadOptions::default(), Some(&store)).unwrap();
        assert_eq!(config.image.as_deref(), Some("remote/image"));
        assert_eq!(config.refresh_interval, None);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_build_folder_resolves_against_its_file() {
        let (dir, leaf) = tree(
            Some("docker-image-build-folder = \"images/tools\""),
            None,
            None,
        );
        let root = dunce::canonicalize(dir.path()).unwrap();
        let config = load(&leaf, LoadOptions::default(), None).unwrap();

        let build = &config.build_configs[0];
        assert_eq!(build.folder.as_deref(), Some(root.join("images/tools").as_path()));
        assert_eq!(build.signature(), "tools");
        assert_eq!(build.source, ConfigSource::ProjectFile(root.join(PROJECT_CONFIG_FILENAME)));
    }

    #[test]
    fn test_build_folder_with_dollar_sign_is_literal() {
        let (dir, leaf) = tree(
            Some("docker-image-build-folder = \"images/$flavor\""),
            None,
            None,
        );
        let root = dunce::canonicalize(dir.path()).unwrap();
        let config = load(&leaf, LoadOptions::default(), None).unwrap();

        let build = &config.build_configs[0];
        assert_eq!(build.folder.as_deref(), Some(root.join("images/$flavor").as_path()));
        assert_eq!(build.signature(), "flavor");
    }

    #[test]
    fn test_partial_version_becomes_requirement() {
        let (_dir, leaf) = tree(
            Some("docker-image-version = \"1.2.3\""),
            None,
            Some("docker-image-version = \"1.x\""),
        );
        let config = load(&leaf, LoadOptions::default(), None).unwrap();
        assert_eq!(config.image_version, None);
        assert_eq!(config.required_version_range.as_deref(), Some("1.x"));
    }

    #[test]
    fn test_explicit_requirement_is_kept_over_partial_version() {
        let (_dir, leaf) = tree(
            None,
            None,
            Some("docker-image-version = \"1.x\"\nrequired-image-version = \">=1.4\""),
        );
        let config = load(&leaf, LoadOptions::default(), None).unwrap();
        assert_eq!(config.image_version, None);
        assert_eq!(config.required_version_range.as_deref(), Some(">=1.4"));
    }

    #[test]
    fn test_missing_start_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("nope"), LoadOptions::default(), None).unwrap_err();
        assert!(matches!(err, ConfigError::StartDir { .. }));
    }
}

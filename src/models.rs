// src/models.rs

use crate::constants::{DEFAULT_IMAGE, DEFAULT_LOG_LEVEL, DEFAULT_REFRESH_INTERVAL, DEFAULT_STORE_ROOT};
use crate::core::commons;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// --- FLAG MODELS ---

/// Whether a flag stands alone or carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    /// A boolean flag taking no value.
    Switch,
    /// A flag requiring a value, inline (`--name=value`) or as the following token.
    Value,
}

/// The declaration of one flag understood by the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: String,
    pub short: Option<char>,
    pub kind: FlagKind,
}

impl FlagSpec {
    /// Declares a switch with no short form.
    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            kind: FlagKind::Switch,
        }
    }

    /// Declares a value flag with no short form.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            kind: FlagKind::Value,
        }
    }

    /// Attaches a single-letter short form.
    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }
}

// --- CONFIGURATION MODELS ---

/// Where a piece of configuration came from.
///
/// Precedence, highest first: CLI overrides, the nearest project file, farther
/// project files, the user overlay, the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    ProjectFile(PathBuf),
    UserConfig(PathBuf),
    RemoteStore,
}

impl ConfigSource {
    /// Entries coming from the remote store apply even when local builds are disabled.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteStore)
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectFile(path) => write!(f, "{}", path.display()),
            Self::UserConfig(path) => write!(f, "user-config ({})", path.display()),
            Self::RemoteStore => write!(f, "remote-store"),
        }
    }
}

/// A fragment of build instructions contributing a signature to the image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildConfig {
    pub instructions: String,
    /// Absolute build directory, when one was configured.
    pub folder: Option<PathBuf>,
    /// Container-tag-safe tag, when one was configured.
    pub tag: Option<String>,
    pub source: ConfigSource,
}

impl ImageBuildConfig {
    /// The short signature appended to the image reference for this fragment.
    ///
    /// The explicit tag wins, then the base name of the build folder, then a short
    /// hash of the instructions.
    pub fn signature(&self) -> String {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            return tag.to_string();
        }
        let folder_name = self
            .folder
            .as_deref()
            .and_then(|f| f.file_name())
            .map(|name| commons::sanitize_tag(&name.to_string_lossy()))
            .filter(|name| !name.is_empty());
        match folder_name {
            Some(name) => name,
            None => format!("b{}", commons::short_hash(self.instructions.as_bytes(), 4)),
        }
    }
}

/// The deserialized structure of a project file or of the user overlay.
///
/// Both the TOML and the JSON flavor go through this model. Keys meant for other
/// tools sharing the file are collected in `unrecognized` and otherwise ignored.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigDocument {
    pub docker_image: Option<String>,
    pub docker_image_version: Option<String>,
    pub docker_image_tag: Option<String>,
    pub docker_image_build: Option<String>,
    pub docker_image_build_folder: Option<String>,
    pub docker_image_build_tag: Option<String>,
    pub docker_refresh: Option<String>,
    pub logging_level: Option<String>,
    pub required_image_version: Option<String>,
    pub recommended_image_version: Option<String>,
    #[serde(default)]
    pub alias: HashMap<String, String>,
    #[serde(flatten)]
    pub unrecognized: HashMap<String, serde::de::IgnoredAny>,
}

/// The configuration resolved from every source for one invocation.
///
/// Every scalar is optional so that "not set" is distinguishable from a default;
/// defaults are only applied by the accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub image: Option<String>,
    pub image_version: Option<String>,
    pub image_tag: Option<String>,
    pub required_version_range: Option<String>,
    pub recommended_version: Option<String>,
    pub log_level: Option<String>,
    pub refresh_interval: Option<Duration>,
    pub aliases: HashMap<String, String>,
    pub build_configs: Vec<ImageBuildConfig>,
}

impl ResolvedConfig {
    /// Merges a lower-precedence layer into `self`.
    ///
    /// A field already set is never touched; an unset field takes the layer's value.
    /// Aliases follow the same rule per name. Build configs are always appended.
    pub fn fill_gaps(&mut self, lower: Self) {
        fill(&mut self.image, lower.image);
        fill(&mut self.image_version, lower.image_version);
        fill(&mut self.image_tag, lower.image_tag);
        fill(&mut self.required_version_range, lower.required_version_range);
        fill(&mut self.recommended_version, lower.recommended_version);
        fill(&mut self.log_level, lower.log_level);
        fill(&mut self.refresh_interval, lower.refresh_interval);
        for (name, expansion) in lower.aliases {
            self.aliases.entry(name).or_insert(expansion);
        }
        self.build_configs.extend(lower.build_configs);
    }

    /// Forgets everything tied to the previous image: exact version, tag and required range.
    pub fn clear_version_context(&mut self) {
        self.image_version = None;
        self.image_tag = None;
        self.required_version_range = None;
    }

    /// The configured image, or the default one.
    pub fn image_name(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }

    /// The configured log level, or the default one.
    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// The configured refresh interval, or the default one.
    pub fn refresh_interval_or_default(&self) -> Duration {
        self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL)
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

// --- COMMAND LINE MODELS ---

/// Typed values parsed from the managed command-line tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    pub image: Option<String>,
    /// Raw `--image-version` value; the `-` placeholder means "no override".
    pub image_version: Option<String>,
    pub image_tag: Option<String>,
    pub log_level: Option<String>,
    pub refresh_image: bool,
    pub local_image: bool,
    pub ignore_user_config: bool,
    pub skip_remote: bool,
    pub parameter_store: Option<PathBuf>,
    pub store_root: String,
    pub get_image_name: bool,
}

impl Default for CliOverrides {
    fn default() -> Self {
        Self {
            image: None,
            image_version: None,
            image_tag: None,
            log_level: None,
            refresh_image: false,
            local_image: true,
            ignore_user_config: false,
            skip_remote: false,
            parameter_store: None,
            store_root: DEFAULT_STORE_ROOT.to_string(),
            get_image_name: false,
        }
    }
}

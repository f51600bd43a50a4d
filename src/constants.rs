// src/constants.rs

use std::time::Duration;

/// The name of the project configuration file, looked up in every directory
/// from the working directory up to the filesystem root.
pub const PROJECT_CONFIG_FILENAME: &str = ".tgf.config";

/// The name of the user overlay file (inside the tgf config directory).
pub const USER_CONFIG_FILENAME: &str = "user.config";

/// The name of the tgf directory under the system config and cache directories.
pub const TGF_DIR: &str = "tgf";

/// The name of the directory holding refresh markers (inside the tgf cache directory).
pub const REFRESH_MARKERS_DIR: &str = "refresh";

/// The image used when no source configures one.
pub const DEFAULT_IMAGE: &str = "coveo/tgf";

/// The log level used when no source configures one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The refresh interval used when no source configures one.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The default root path of the remote parameter store.
pub const DEFAULT_STORE_ROOT: &str = "/default/tgf";

/// The placeholder meaning "no image version override" on the command line.
pub const NO_VERSION_OVERRIDE: &str = "-";

/// The delimiter chaining the version, tag and build signatures of an image reference.
pub const TAG_DELIMITER: &str = "-";

/// Upper bound on nested alias expansions, on top of cycle detection.
pub const MAX_ALIAS_DEPTH: usize = 64;

// Leaf keys shared by the config documents and the parameter store.
pub const KEY_IMAGE: &str = "docker-image";
pub const KEY_IMAGE_VERSION: &str = "docker-image-version";
pub const KEY_IMAGE_TAG: &str = "docker-image-tag";
pub const KEY_IMAGE_BUILD: &str = "docker-image-build";
pub const KEY_IMAGE_BUILD_FOLDER: &str = "docker-image-build-folder";
pub const KEY_IMAGE_BUILD_TAG: &str = "docker-image-build-tag";
pub const KEY_REFRESH: &str = "docker-refresh";
pub const KEY_LOGGING_LEVEL: &str = "logging-level";
pub const KEY_ALIAS: &str = "alias";

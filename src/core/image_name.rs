// src/core/image_name.rs

//! # Image Name Builder
//!
//! Derives the final image reference from the resolved configuration, the command-line
//! overrides and, when the version is not known yet, the registry.
//!
//! The reference has the shape `image[:tag-part][<sep>build-signatures]`, where the tag
//! part is either the explicit version override or `version[-tag]`.

use crate::constants::{NO_VERSION_OVERRIDE, TAG_DELIMITER};
use crate::core::version::{self, VersionError};
use crate::models::{CliOverrides, ResolvedConfig};
use crate::system::registry::{ImageRegistry, RegistryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error("Could not determine the version of image '{image}': {source}")]
    Registry {
        image: String,
        #[source]
        source: RegistryError,
    },
}

/// Resolves image references, asking the registry for versions it cannot infer.
#[derive(Debug)]
pub struct ImageNameBuilder<'a> {
    registry: &'a dyn ImageRegistry,
}

impl<'a> ImageNameBuilder<'a> {
    pub fn new(registry: &'a dyn ImageRegistry) -> Self {
        Self { registry }
    }

    /// Applies the image-related overrides to `config` and returns the final reference.
    ///
    /// `config` is updated in place: a switched image loses its version context, and a
    /// version looked up from the registry is recorded.
    ///
    /// # Errors
    /// - `VersionMismatch` when the known or looked-up version is outside the required range.
    /// - `MalformedVersion` when a version or range cannot be parsed.
    /// - `Registry` when the version lookup fails.
    pub fn build(
        &self,
        config: &mut ResolvedConfig,
        overrides: &CliOverrides,
    ) -> Result<String, ImageError> {
        if let Some(image) = &overrides.image {
            log::debug!(
                "Image overridden: '{}' -> '{}', version context cleared.",
                config.image_name(),
                image
            );
            config.image = Some(image.clone());
            config.clear_version_context();
        }
        if let Some(tag) = &overrides.image_tag {
            config.image_tag = Some(tag.clone());
        }

        let version_override = version_override(overrides);

        if let Some(forced) = version_override {
            log::debug!("Using image version '{}' as given on the command line.", forced);
        } else if let Some(known) = config.image_version.as_deref() {
            if let Some(range) = config.required_version_range.as_deref() {
                version::require(known, range)?;
            }
        } else {
            let reference = tagged_reference(config);
            let found = self
                .registry
                .get_version(&reference)
                .map_err(|e| ImageError::Registry {
                    image: reference.clone(),
                    source: e,
                })?;
            log::debug!("Image '{}' is at version '{}'.", reference, found);
            if let Some(range) = config.required_version_range.as_deref() {
                version::require(&found, range)?;
            }
            config.image_version = Some(found);
        }

        warn_below_recommended(config);
        Ok(compose(config, version_override, overrides.local_image))
    }
}

/// The explicit `--image-version`, unless it is empty or the "no override" placeholder.
fn version_override(overrides: &CliOverrides) -> Option<&str> {
    overrides
        .image_version
        .as_deref()
        .filter(|v| !v.is_empty() && *v != NO_VERSION_OVERRIDE)
}

/// The reference of the image the local builds start from, i.e. without build signatures.
///
/// This is what gets pulled on refresh. Call it after [`ImageNameBuilder::build`] so the
/// version is known.
pub fn base_reference(config: &ResolvedConfig, overrides: &CliOverrides) -> String {
    let tag_part = tag_part(config, version_override(overrides));
    if tag_part.is_empty() {
        config.image_name().to_string()
    } else {
        format!("{}:{}", config.image_name(), tag_part)
    }
}

fn tag_part(config: &ResolvedConfig, version_override: Option<&str>) -> String {
    match version_override {
        Some(forced) => forced.to_string(),
        None => [config.image_version.as_deref(), config.image_tag.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(TAG_DELIMITER),
    }
}

/// The reference used to ask the registry for a version: `image[:tag]`.
fn tagged_reference(config: &ResolvedConfig) -> String {
    match config.image_tag.as_deref().filter(|t| !t.is_empty()) {
        Some(tag) => format!("{}:{}", config.image_name(), tag),
        None => config.image_name().to_string(),
    }
}

fn warn_below_recommended(config: &ResolvedConfig) {
    let (Some(recommended), Some(current)) = (
        config.recommended_version.as_deref(),
        config.image_version.as_deref(),
    ) else {
        return;
    };
    let minimum = format!(">={}", recommended.trim_start_matches(['>', '=']));
    match version::validate(current, &minimum) {
        Ok(true) => {}
        Ok(false) => log::warn!(
            "Image version '{}' is older than the recommended version '{}'. Consider upgrading.",
            current,
            recommended
        ),
        Err(e) => log::warn!("Could not compare with the recommended version: {}", e),
    }
}

/// Assembles `image[:tag-part][<sep>build-signatures]`.
///
/// Build configs coming from local files only count when `local_builds` is set;
/// those from the remote store always count. Signatures keep source order.
pub fn compose(config: &ResolvedConfig, version_override: Option<&str>, local_builds: bool) -> String {
    let tag_part = tag_part(config, version_override);
    let signatures = config
        .build_configs
        .iter()
        .filter(|build| local_builds || build.source.is_remote())
        .map(|build| build.signature())
        .collect::<Vec<_>>()
        .join(TAG_DELIMITER);

    let mut reference = config.image_name().to_string();
    if !tag_part.is_empty() {
        reference.push(':');
        reference.push_str(&tag_part);
    }
    if !signatures.is_empty() {
        reference.push_str(if tag_part.is_empty() { ":" } else { TAG_DELIMITER });
        reference.push_str(&signatures);
    }
    reference
}

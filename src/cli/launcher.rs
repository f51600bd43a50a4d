// src/cli/launcher.rs

//! The launch pipeline: raw arguments in, resolved image and forwarded arguments out.

use crate::cli;
use crate::core::alias_expander;
use crate::core::arg_classifier::{self, Classified};
use crate::core::config_loader::{ConfigLoader, LoadOptions};
use crate::core::image_name::{self, ImageNameBuilder};
use crate::core::refresh_gate::RefreshGate;
use crate::models::{CliOverrides, ResolvedConfig};
use crate::system::parameter_store::{DirectoryStore, ParameterStore};
use crate::system::registry::ImageRegistry;
use anyhow::{Context, Result};
use log::LevelFilter;
use std::path::PathBuf;

/// Everything the pipeline needs from the outside world.
#[derive(Debug)]
pub struct Environment<'a> {
    /// Directory where the project file lookup starts.
    pub start_dir: PathBuf,
    /// Location of the user overlay, if the platform has one.
    pub user_config: Option<PathBuf>,
    /// Store used when `--parameter-store` is not given.
    pub store: Option<&'a dyn ParameterStore>,
    pub registry: &'a dyn ImageRegistry,
    pub gate: RefreshGate,
}

/// The outcome of [`prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Launch {
    /// The full image reference, build signatures included.
    pub image: String,
    pub config: ResolvedConfig,
    pub overrides: CliOverrides,
    /// Arguments for the wrapped command, in their original order.
    pub forwarded: Vec<String>,
    /// Whether the base image was pulled during this run.
    pub refreshed: bool,
}

/// Resolves the image to run and the arguments to forward.
///
/// Arguments are classified twice: once on the raw tokens to learn which configuration
/// sources to read, then again after alias expansion, since aliases come from
/// configuration.
///
/// # Errors
/// Fails on invalid frontend flags, unreadable configuration, alias cycles, version
/// mismatches, and registry or refresh marker failures.
pub fn prepare(args: &[String], env: &Environment<'_>) -> Result<Launch> {
    let registry = cli::flag_registry();

    let Classified { managed, .. } = arg_classifier::classify(args, &registry);
    let early = cli::parse_overrides(&managed)?;
    let mut config = load_config(env, &early)?;

    let expanded = alias_expander::expand(args, &config.aliases)?;
    if expanded.as_slice() != args {
        log::debug!("Arguments after alias expansion: {:?}", expanded);
    }
    let Classified { managed, unmanaged } = arg_classifier::classify(&expanded, &registry);
    let overrides = cli::parse_overrides(&managed)?;
    if !same_sources(&early, &overrides) {
        log::debug!("Aliases changed the configuration sources, reloading.");
        let aliases = std::mem::take(&mut config.aliases);
        config = load_config(env, &overrides)?;
        config.aliases = aliases;
    }

    if let Some(level) = &overrides.log_level {
        config.log_level = Some(level.clone());
    }
    log::set_max_level(level_filter(config.log_level_or_default()));

    let image = ImageNameBuilder::new(env.registry).build(&mut config, &overrides)?;
    log::debug!("Resolved image: {}", image);

    let refreshed = if overrides.get_image_name {
        false
    } else {
        refresh(env, &config, &overrides)?
    };

    Ok(Launch {
        image,
        config,
        overrides,
        forwarded: unmanaged,
        refreshed,
    })
}

fn load_config(env: &Environment<'_>, overrides: &CliOverrides) -> Result<ResolvedConfig> {
    let directory_store = overrides.parameter_store.as_ref().map(DirectoryStore::new);
    let store = if overrides.skip_remote {
        None
    } else {
        directory_store
            .as_ref()
            .map(|store| store as &dyn ParameterStore)
            .or(env.store)
    };
    let options = LoadOptions {
        user_config: env.user_config.clone(),
        ignore_user_config: overrides.ignore_user_config,
        store_root: overrides.store_root.clone(),
    };
    ConfigLoader::new(options, store)
        .load(&env.start_dir)
        .with_context(|| format!("Failed to load the configuration for '{}'", env.start_dir.display()))
}

fn same_sources(a: &CliOverrides, b: &CliOverrides) -> bool {
    a.ignore_user_config == b.ignore_user_config
        && a.skip_remote == b.skip_remote
        && a.parameter_store == b.parameter_store
        && a.store_root == b.store_root
}

/// Pulls the base image when forced or when its refresh interval has elapsed.
fn refresh(env: &Environment<'_>, config: &ResolvedConfig, overrides: &CliOverrides) -> Result<bool> {
    // Keyed on the pulled reference: local build signatures never reach the registry,
    // so every build variant of one base image shares its marker.
    let base = image_name::base_reference(config, overrides);
    let due = overrides.refresh_image
        || env
            .gate
            .is_due(&base, config.refresh_interval_or_default())
            .context("Failed to check the image refresh marker")?;
    if !due {
        return Ok(false);
    }

    env.registry
        .pull(&base)
        .with_context(|| format!("Failed to refresh image '{}'", base))?;
    env.gate
        .touch(&base)
        .context("Failed to update the image refresh marker")?;
    Ok(true)
}

/// Maps a configured logging level to a `log` filter.
///
/// Accepts the `log` names plus `notice`, `warning`, `critical` and `fatal`.
/// Unknown names fall back to `info` with a warning.
pub fn level_filter(raw: &str) -> LevelFilter {
    match raw.trim().to_ascii_lowercase().as_str() {
        "notice" => LevelFilter::Info,
        "warning" => LevelFilter::Warn,
        "critical" | "fatal" => LevelFilter::Error,
        other => other.parse().unwrap_or_else(|_| {
            log::warn!("Unknown logging level '{}', using 'info'.", raw);
            LevelFilter::Info
        }),
    }
}

// src/bin/tgf.rs

use anyhow::{Context, Result};
use colored::*;
use log::LevelFilter;
use std::env;
use tgf::{
    cli::launcher::{self, Environment},
    core::{
        image_name::ImageError,
        paths,
        refresh_gate::RefreshGate,
        version::VersionError,
    },
    system::registry::DockerCli,
};

/// Exit code used when the image version is outside the required range.
const EXIT_VERSION_MISMATCH: i32 = 3;

fn main() {
    // Every record reaches the logger; `log::set_max_level` decides what is emitted.
    env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .parse_default_env()
        .init();
    log::set_max_level(LevelFilter::Warn);

    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    if let Err(e) = run(&args) {
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }

        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        let code = if e.chain().any(is_version_mismatch) {
            EXIT_VERSION_MISMATCH
        } else {
            1
        };
        std::process::exit(code);
    }
}

fn run(args: &[String]) -> Result<()> {
    let start_dir = env::current_dir().context("Failed to read the current directory")?;
    let user_config = match paths::get_user_config_path() {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    };
    let registry = DockerCli::default();
    let environment = Environment {
        start_dir,
        user_config,
        store: None,
        registry: &registry,
        gate: RefreshGate::new(paths::get_refresh_markers_dir()?),
    };

    let launch = launcher::prepare(args, &environment)?;
    if launch.overrides.get_image_name {
        println!("{}", launch.image);
        return Ok(());
    }

    let forwarded = shlex::try_join(launch.forwarded.iter().map(String::as_str))
        .context("Failed to quote the forwarded arguments")?;
    log::info!("Image: {}", launch.image.cyan());
    if forwarded.is_empty() {
        println!("{}", launch.image);
    } else {
        println!("{} {}", launch.image, forwarded);
    }
    Ok(())
}

fn is_version_mismatch(cause: &(dyn std::error::Error + 'static)) -> bool {
    matches!(
        cause.downcast_ref::<ImageError>(),
        Some(ImageError::Version(VersionError::VersionMismatch { .. }))
    ) || matches!(
        cause.downcast_ref::<VersionError>(),
        Some(VersionError::VersionMismatch { .. })
    )
}

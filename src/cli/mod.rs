// src/cli/mod.rs

//! The command-line surface of tgf.
//!
//! The `Cli` declarations serve twice: they produce the flag registry used to
//! classify raw arguments, and they parse the managed tokens into [`CliOverrides`].

use crate::constants::{DEFAULT_STORE_ROOT, NO_VERSION_OVERRIDE};
use crate::core::flag_registry::FlagRegistry;
use crate::models::CliOverrides;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

pub mod launcher;

/// tgf: runs a containerized command with an automatically resolved image.
///
/// Every argument tgf does not recognize is forwarded to the wrapped command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "tgf",
    author,
    version,
    about,
    args_override_self = true,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Cli {
    /// Use this image instead of the configured one.
    #[arg(long, env = "TGF_IMAGE", value_name = "IMAGE")]
    pub image: Option<String>,

    /// Use this image version verbatim ('-' means no override).
    #[arg(long, env = "TGF_IMAGE_VERSION", value_name = "VERSION", default_value = NO_VERSION_OVERRIDE)]
    pub image_version: String,

    /// Use this image tag.
    #[arg(short = 'T', long = "tag", env = "TGF_IMAGE_TAG", value_name = "TAG")]
    pub tag: Option<String>,

    /// Set the logging level (error, warn, info, debug, trace).
    #[arg(short = 'L', long, env = "TGF_LOGGING_LEVEL", value_name = "LEVEL")]
    pub logging_level: Option<String>,

    /// Force a refresh of the image.
    #[arg(short = 'r', long)]
    pub refresh_image: bool,

    /// Apply the build instructions of local configuration files (default).
    #[arg(long, overrides_with = "no_local_image")]
    pub local_image: bool,

    /// Ignore the build instructions of local configuration files.
    #[arg(long, overrides_with = "local_image")]
    pub no_local_image: bool,

    /// Do not read the user configuration file.
    #[arg(long)]
    pub ignore_user_config: bool,

    /// Do not read configuration from the parameter store.
    #[arg(long)]
    pub skip_remote: bool,

    /// Directory holding the parameter store tree.
    #[arg(long, env = "TGF_PARAMETER_STORE", value_name = "DIR")]
    pub parameter_store: Option<PathBuf>,

    /// Root path of the tgf keys in the parameter store.
    #[arg(long, env = "TGF_STORE_ROOT", value_name = "PATH", default_value = DEFAULT_STORE_ROOT)]
    pub store_root: String,

    /// Print the resolved image name and exit.
    #[arg(long)]
    pub get_image_name: bool,
}

impl From<Cli> for CliOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            image: cli.image,
            image_version: Some(cli.image_version),
            image_tag: cli.tag,
            log_level: cli.logging_level,
            refresh_image: cli.refresh_image,
            local_image: !cli.no_local_image,
            ignore_user_config: cli.ignore_user_config,
            skip_remote: cli.skip_remote,
            parameter_store: cli.parameter_store,
            store_root: cli.store_root,
            get_image_name: cli.get_image_name,
        }
    }
}

/// The registry of every flag declared on [`Cli`], including `--help` and `--version`.
pub fn flag_registry() -> FlagRegistry {
    let mut command = Cli::command();
    command.build();
    FlagRegistry::from_command(&command)
}

/// Parses managed tokens into typed overrides.
///
/// Undeclared `--no-<flag>` tokens cancel the earlier occurrences of `<flag>`
/// before clap sees the tokens.
///
/// # Errors
/// Returns clap's error for invalid tokens, and for `--help`/`--version`.
pub fn parse_overrides(managed: &[String]) -> Result<CliOverrides, clap::Error> {
    parse_with(Cli::command(), managed)
}

fn parse_with(mut command: clap::Command, managed: &[String]) -> Result<CliOverrides, clap::Error> {
    command.build();
    let tokens = apply_negations(&command, managed);
    let matches = command.try_get_matches_from(std::iter::once("tgf".to_string()).chain(tokens))?;
    Ok(Cli::from_arg_matches(&matches)?.into())
}

fn apply_negations(command: &clap::Command, tokens: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let Some(name) = token.strip_prefix("--no-") else {
            kept.push(token.clone());
            continue;
        };
        let declared = |long: &str| command.get_arguments().find(|a| a.get_long() == Some(long));
        // `--no-local-image` is a real flag; `--no-x=value` is left for clap to reject.
        let negated = match token.strip_prefix("--") {
            Some(full) if declared(full).is_none() && !name.contains('=') => declared(name),
            _ => None,
        };
        match negated {
            Some(arg) => {
                log::debug!("'{}' cancels the previous occurrences of '--{}'.", token, name);
                let takes_value = arg.get_action().takes_values();
                remove_occurrences(&mut kept, name, arg.get_short(), takes_value);
                if takes_value {
                    // The classifier gave the negation the following token as its value.
                    iter.next();
                }
            }
            None => kept.push(token.clone()),
        }
    }
    kept
}

fn remove_occurrences(tokens: &mut Vec<String>, long: &str, short: Option<char>, takes_value: bool) {
    let exact_long = format!("--{long}");
    let inline_long = format!("--{long}=");
    let exact_short = short.map(|c| format!("-{c}"));

    let mut iter = std::mem::take(tokens).into_iter();
    while let Some(token) = iter.next() {
        if token.starts_with(&inline_long) {
            continue;
        }
        if token == exact_long || exact_short.as_deref() == Some(token.as_str()) {
            if takes_value {
                iter.next();
            }
            continue;
        }
        tokens.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlagKind;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    /// Parses without the environment fallbacks so the host environment cannot leak in.
    fn parse(raw: &[&str]) -> Result<CliOverrides, clap::Error> {
        let command = Cli::command().mut_args(|arg| arg.env(None::<&'static str>));
        parse_with(command, &tokens(raw))
    }

    #[test]
    fn test_cli_declaration_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_registry_mirrors_declarations() {
        let registry = flag_registry();
        assert_eq!(registry.long_kind("image"), Some(FlagKind::Value));
        assert_eq!(registry.long_kind("tag"), Some(FlagKind::Value));
        assert_eq!(registry.short_kind('T'), Some(FlagKind::Value));
        assert_eq!(registry.short_kind('L'), Some(FlagKind::Value));
        assert_eq!(registry.long_kind("refresh-image"), Some(FlagKind::Switch));
        assert_eq!(registry.short_kind('r'), Some(FlagKind::Switch));
        assert_eq!(registry.long_kind("no-local-image"), Some(FlagKind::Switch));
        assert_eq!(registry.long_kind("help"), Some(FlagKind::Switch));
        assert_eq!(registry.long_kind("stuff"), None);
    }

    #[test]
    fn test_parse_overrides() {
        let overrides = parse(&[
            "--image", "org/img", "-T", "aws", "-r", "--get-image-name", "--store-root=/acme/tgf",
        ])
        .unwrap();

        assert_eq!(overrides.image.as_deref(), Some("org/img"));
        assert_eq!(overrides.image_tag.as_deref(), Some("aws"));
        assert!(overrides.refresh_image);
        assert!(overrides.get_image_name);
        assert!(overrides.local_image);
        assert_eq!(overrides.store_root, "/acme/tgf");
    }

    #[test]
    fn test_last_occurrence_wins() {
        let overrides = parse(&["-T", "one", "--tag=two"]).unwrap();
        assert_eq!(overrides.image_tag.as_deref(), Some("two"));

        let overrides = parse(&["--no-local-image", "--local-image"]).unwrap();
        assert!(overrides.local_image);
        let overrides = parse(&["--local-image", "--no-local-image"]).unwrap();
        assert!(!overrides.local_image);
    }

    #[test]
    fn test_negation_cancels_previous_occurrences() {
        let overrides =
            parse(&["-r", "--refresh-image", "--no-refresh-image"]).unwrap();
        assert!(!overrides.refresh_image);

        let overrides =
            parse(&["--no-refresh-image", "--refresh-image"]).unwrap();
        assert!(overrides.refresh_image);

        let overrides = parse(&["-T", "aws", "--tag=gcp", "--no-tag"]).unwrap();
        assert_eq!(overrides.image_tag, None);
    }

    #[test]
    fn test_negated_value_flag_drops_its_value() {
        let registry = flag_registry();
        let classified =
            crate::core::arg_classifier::classify(&tokens(&["-T", "aws", "--no-tag", "plan"]), &registry);
        assert_eq!(classified.managed, tokens(&["-T", "aws", "--no-tag", "plan"]));

        let overrides = parse(&["-T", "aws", "--no-tag", "plan"]).unwrap();
        assert_eq!(overrides.image_tag, None);
    }

    #[test]
    fn test_unknown_negation_is_rejected_by_clap() {
        assert!(parse(&["--no-such-flag"]).is_err());
    }

    #[test]
    fn test_help_is_reported_as_clap_error() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}

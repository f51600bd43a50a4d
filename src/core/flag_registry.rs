// src/core/flag_registry.rs

//! # Flag Registry
//!
//! An immutable lookup table of the flags the frontend understands, keyed by long
//! name and, separately, by short character. It is built once before any argument
//! is classified and never mutated afterwards.

use crate::models::{FlagKind, FlagSpec};
use std::collections::HashMap;

/// The table of recognized long and short flags.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    long: HashMap<String, FlagKind>,
    short: HashMap<char, FlagKind>,
}

impl FlagRegistry {
    /// Builds the registry from a set of flag declarations.
    ///
    /// When a name is declared twice, the last declaration wins.
    pub fn new<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = FlagSpec>,
    {
        let mut long = HashMap::new();
        let mut short = HashMap::new();
        for spec in specs {
            if let Some(c) = spec.short {
                short.insert(c, spec.kind);
            }
            long.insert(spec.name, spec.kind);
        }
        Self { long, short }
    }

    /// Builds the registry from the arguments declared on a clap command.
    ///
    /// Positional arguments are skipped. An argument whose action takes values is a
    /// value flag; everything else is a switch.
    pub fn from_command(command: &clap::Command) -> Self {
        let mut registry = Self::default();
        for arg in command.get_arguments() {
            let kind = if arg.get_action().takes_values() {
                FlagKind::Value
            } else {
                FlagKind::Switch
            };
            if let Some(c) = arg.get_short() {
                registry.short.insert(c, kind);
            }
            let longs = arg
                .get_long()
                .into_iter()
                .chain(arg.get_all_aliases().unwrap_or_default());
            for name in longs {
                registry.long.insert(name.to_string(), kind);
            }
        }
        registry
    }

    /// Looks up a long flag name (without the leading `--`).
    pub fn long_kind(&self, name: &str) -> Option<FlagKind> {
        self.long.get(name).copied()
    }

    /// Looks up a short flag character.
    pub fn short_kind(&self, c: char) -> Option<FlagKind> {
        self.short.get(&c).copied()
    }
}

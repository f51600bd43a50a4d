// src/core/arg_classifier.rs

//! # Argument Classifier
//!
//! Splits a token sequence into the tokens consumed by the frontend (managed) and the
//! tokens forwarded verbatim to the wrapped command (unmanaged). Classification is
//! total: every token lands in exactly one partition, except a `--` separator which
//! is consumed. Relative order is kept inside each partition.

use crate::core::flag_registry::FlagRegistry;
use crate::models::FlagKind;

/// The two partitions produced by [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    /// Tokens understood by the frontend, including the values of its value flags.
    pub managed: Vec<String>,
    /// Tokens forwarded to the wrapped command.
    pub unmanaged: Vec<String>,
}

/// Classifies `tokens` against `registry`.
///
/// # Logic:
/// - `--` sends everything after it to *unmanaged* and stops.
/// - `--name[=value]` is managed when `name` (with any `no-` prefix removed) is
///   registered. A value flag without an inline value also takes the next token.
///   Unknown long flags are unmanaged and never take the next token.
/// - `-abc` is managed when every char is registered. A value flag as the last char
///   takes the next token. Any unknown char makes the whole token unmanaged.
/// - Anything else is a positional and goes to *unmanaged*.
pub fn classify(tokens: &[String], registry: &FlagRegistry) -> Classified {
    let mut result = Classified::default();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        if token == "--" {
            result.unmanaged.extend(iter.by_ref().cloned());
            break;
        }

        let takes_next = if let Some(body) = token.strip_prefix("--") {
            match classify_long(body, registry) {
                Some(takes_next) => takes_next,
                None => {
                    result.unmanaged.push(token.clone());
                    continue;
                }
            }
        } else if let Some(body) = token.strip_prefix('-').filter(|b| !b.is_empty()) {
            match classify_short(body, registry) {
                Some(takes_next) => takes_next,
                None => {
                    result.unmanaged.push(token.clone());
                    continue;
                }
            }
        } else {
            result.unmanaged.push(token.clone());
            continue;
        };

        result.managed.push(token.clone());
        if takes_next {
            if let Some(value) = iter.next() {
                result.managed.push(value.clone());
            }
        }
    }

    result
}

/// Returns `None` when the long flag is not registered, otherwise whether the
/// following token is its value.
fn classify_long(body: &str, registry: &FlagRegistry) -> Option<bool> {
    let (name, inline_value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    };
    let lookup = name.strip_prefix("no-").unwrap_or(name);

    match registry.long_kind(lookup)? {
        FlagKind::Value => Some(inline_value.is_none()),
        FlagKind::Switch => Some(false),
    }
}

/// Returns `None` when any char is not registered, otherwise whether the
/// following token is the value of a trailing value flag.
fn classify_short(body: &str, registry: &FlagRegistry) -> Option<bool> {
    let mut last = None;
    for c in body.chars() {
        last = Some(registry.short_kind(c)?);
    }
    Some(last == Some(FlagKind::Value))
}

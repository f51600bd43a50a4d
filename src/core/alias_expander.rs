// src/core/alias_expander.rs

//! # Alias Expander
//!
//! Rewrites a token sequence by replacing every token that names an alias with the
//! tokenized expansion of that alias. Expansions are scanned again, so an alias may
//! refer to other aliases. An alias that re-enters itself is reported as a cycle.

use crate::constants::MAX_ALIAS_DEPTH;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AliasError {
    #[error("Alias cycle detected: {chain}")]
    CycleDetected { chain: String },
    #[error("Maximum alias depth ({depth}) exceeded while expanding '{alias}'.")]
    MaxDepth { depth: usize, alias: String },
}

/// Expands every alias found in `tokens`.
///
/// Tokens that do not name an alias pass through unchanged and in order. A sequence
/// without any alias name is returned as is.
pub fn expand(tokens: &[String], aliases: &HashMap<String, String>) -> Result<Vec<String>, AliasError> {
    let mut expanded = Vec::with_capacity(tokens.len());
    let mut stack = Vec::new();
    expand_into(tokens, aliases, &mut stack, &mut expanded)?;
    Ok(expanded)
}

fn expand_into<'a>(
    tokens: &[String],
    aliases: &'a HashMap<String, String>,
    stack: &mut Vec<&'a str>,
    out: &mut Vec<String>,
) -> Result<(), AliasError> {
    for token in tokens {
        let Some((name, expansion)) = aliases.get_key_value(token.as_str()) else {
            out.push(token.clone());
            continue;
        };

        if stack.contains(&name.as_str()) {
            let mut chain: Vec<&str> = stack.clone();
            chain.push(name);
            return Err(AliasError::CycleDetected {
                chain: chain.join(" -> "),
            });
        }
        if stack.len() >= MAX_ALIAS_DEPTH {
            return Err(AliasError::MaxDepth {
                depth: MAX_ALIAS_DEPTH,
                alias: name.clone(),
            });
        }

        log::debug!("Expanding alias '{}' to '{}'", name, expansion);
        stack.push(name);
        expand_into(&tokenize(expansion), aliases, stack, out)?;
        stack.pop();
    }
    Ok(())
}

/// Splits an alias expansion on whitespace, keeping text between double quotes
/// together and dropping the quotes themselves.
///
/// `--var="a b" plan` gives `["--var=a b", "plan"]`. An unterminated quote runs to
/// the end of the string.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

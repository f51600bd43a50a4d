// src/core/version.rs

//! # Version Resolver
//!
//! Parses version-range expressions and checks concrete versions against them.
//!
//! ```text
//! range := [op] major ['.' minor ['.' patch ['-' prerelease]]]
//! op    := "=" | ">="            (default "=")
//! ```
//!
//! Any trailing component may be the wildcard `x` or be omitted; a wildcard matches
//! any value at its position and at every position to its right.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Malformed version or version range '{value}'.")]
    MalformedVersion { value: String },
    #[error("Image version '{version}' does not satisfy the required version '{range}'.")]
    VersionMismatch { version: String, range: String },
}

type VersionResult<T> = Result<T, VersionError>;

/// The comparison applied by a [`VersionRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOperator {
    Equals,
    GreaterOrEqual,
}

/// A concrete version. Missing minor or patch components count as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

/// A version constraint. `None` components are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub operator: RangeOperator,
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Splits `1.2.3-rc.1` into its numeric part and its prerelease.
fn split_prerelease(raw: &str) -> (&str, Option<String>) {
    match raw.split_once('-') {
        Some((numbers, pre)) => (numbers, Some(pre.to_string())),
        None => (raw, None),
    }
}

fn malformed(raw: &str) -> VersionError {
    VersionError::MalformedVersion {
        value: raw.to_string(),
    }
}

impl Version {
    /// Parses a concrete version such as `1.20.0`, `1.18` or `v2.0.1-beta`.
    pub fn parse(raw: &str) -> VersionResult<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let (numbers, prerelease) = split_prerelease(trimmed);

        let mut parts = numbers.split('.');
        let mut next_number = |required: bool| -> VersionResult<u64> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| malformed(raw)),
                None if required => Err(malformed(raw)),
                None => Ok(0),
            }
        };
        let major = next_number(true)?;
        let minor = next_number(false)?;
        let patch = next_number(false)?;
        if parts.next().is_some() {
            return Err(malformed(raw));
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }
}

impl VersionRange {
    /// Parses a range such as `>=1.19.x`, `=1.22.x`, `1.x` or `2.0.1-rc1`.
    pub fn parse(raw: &str) -> VersionResult<Self> {
        let trimmed = raw.trim();
        let (operator, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (RangeOperator::GreaterOrEqual, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (RangeOperator::Equals, rest)
        } else {
            (RangeOperator::Equals, trimmed)
        };
        let (numbers, prerelease) = split_prerelease(rest.trim());

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() > 3 {
            return Err(malformed(raw));
        }
        let major = parts
            .first()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| malformed(raw))?;

        // Once a wildcard is met, everything to its right is a wildcard too.
        let mut components = [None, None];
        for (slot, part) in components.iter_mut().zip(parts.iter().skip(1)) {
            if *part == "x" {
                break;
            }
            *slot = Some(part.parse::<u64>().map_err(|_| malformed(raw))?);
        }
        let [minor, patch] = components;

        Ok(Self {
            operator,
            major,
            minor,
            patch,
            // A prerelease only means something after a concrete patch.
            prerelease: patch.and(prerelease),
        })
    }

    /// Whether `version` satisfies this range.
    pub fn matches(&self, version: &Version) -> bool {
        let pairs = [
            (Some(self.major), version.major),
            (self.minor, version.minor),
            (self.patch, version.patch),
        ];

        match self.operator {
            RangeOperator::Equals => {
                let numbers_match = pairs
                    .iter()
                    .all(|(wanted, have)| wanted.is_none_or(|w| w == *have));
                let prerelease_matches = self
                    .prerelease
                    .as_ref()
                    .is_none_or(|pre| version.prerelease.as_ref() == Some(pre));
                numbers_match && prerelease_matches
            }
            RangeOperator::GreaterOrEqual => {
                for (wanted, have) in pairs {
                    let Some(wanted) = wanted else {
                        return true;
                    };
                    if have != wanted {
                        return have > wanted;
                    }
                }
                match (&self.prerelease, &version.prerelease) {
                    (None, _) | (Some(_), None) => true,
                    (Some(wanted), Some(have)) => have >= wanted,
                }
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operator {
            RangeOperator::Equals => "=",
            RangeOperator::GreaterOrEqual => ">=",
        };
        write!(f, "{}{}", op, self.major)?;
        match (self.minor, self.patch) {
            (None, _) => write!(f, ".x")?,
            (Some(minor), None) => write!(f, ".{}.x", minor)?,
            (Some(minor), Some(patch)) => write!(f, ".{}.{}", minor, patch)?,
        }
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Checks `candidate` against `range`.
///
/// # Errors
/// Returns `MalformedVersion` when either string cannot be parsed.
pub fn validate(candidate: &str, range: &str) -> VersionResult<bool> {
    let version = Version::parse(candidate)?;
    let range = VersionRange::parse(range)?;
    Ok(range.matches(&version))
}

/// Like [`validate`], but a version outside the range is a `VersionMismatch` error.
pub fn require(candidate: &str, range: &str) -> VersionResult<()> {
    if validate(candidate, range)? {
        Ok(())
    } else {
        Err(VersionError::VersionMismatch {
            version: candidate.to_string(),
            range: range.to_string(),
        })
    }
}

/// Whether an exact-version field actually holds a requirement (an operator or a
/// wildcard), meaning the concrete version has to be resolved dynamically.
pub fn is_partial(version: &str) -> bool {
    let trimmed = version.trim();
    if trimmed.starts_with(">=") || trimmed.starts_with('=') {
        return true;
    }
    let (numbers, _) = split_prerelease(trimmed);
    numbers.split('.').any(|part| part == "x")
}

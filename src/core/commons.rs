// src/core/commons.rs

// Small helpers shared by the loader, the image name builder and the refresh gate.

use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

lazy_static! {
    static ref UNSAFE_TAG_CHARS: Regex =
        Regex::new(r"[^A-Za-z0-9_.-]").expect("tag sanitizer regex is valid");
    static ref DURATION_RE: Regex =
        Regex::new(r"^(?:\d+[smhd])+$").expect("duration regex is valid");
    static ref DURATION_PART_RE: Regex =
        Regex::new(r"(\d+)([smhd])").expect("duration part regex is valid");
}

/// Removes every character that is not allowed in a container image tag.
/// A tag may not start with `.` or `-`, so those are trimmed too.
pub fn sanitize_tag(raw: &str) -> String {
    let cleaned = UNSAFE_TAG_CHARS.replace_all(raw, "");
    cleaned.trim_start_matches(['.', '-']).to_string()
}

/// Hex encoding of the first `bytes` bytes of the blake3 hash of `data`.
pub fn short_hash(data: &[u8], bytes: usize) -> String {
    let hash = blake3::hash(data);
    let len = bytes.min(hash.as_bytes().len());
    hex::encode(hash.as_bytes().get(..len).unwrap_or_default())
}

/// Parses durations such as `90s`, `15m`, `1h30m` or `2d`. A bare integer is seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    if !DURATION_RE.is_match(raw) {
        return None;
    }

    let mut total: u64 = 0;
    for caps in DURATION_PART_RE.captures_iter(raw) {
        let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = match caps.get(2)?.as_str() {
            "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            _ => 24 * 60 * 60,
        };
        total = total.checked_add(amount.checked_mul(unit)?)?;
    }
    Some(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("my tools"), "mytools");
        assert_eq!(sanitize_tag("v1.2_final-rc"), "v1.2_final-rc");
        assert_eq!(sanitize_tag("--lead/ing:"), "leading");
        assert_eq!(sanitize_tag("é!"), "");
    }

    #[test]
    fn test_short_hash_is_stable() {
        let first = short_hash(b"hello world", 16);
        assert_eq!(first, "d74981efa70a0c880b8d8c1985d075db");
        assert_eq!(short_hash(b"hello world", 4), "d74981ef");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(" 2d "), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_duration("1 hour"), None);
        assert_eq!(parse_duration(""), None);
    }
}

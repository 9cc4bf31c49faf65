//! Server version parsing.
//!
//! BadgeKit reports versions such as `0.2.9`, but callers often state a
//! requirement like `0.2`. Missing minor and patch components are read as
//! zero before handing the string to `semver`.

use semver::Version;

use crate::error::ApiError;

/// Parses `0`, `0.2` or `0.2.9` (optionally prefixed with `v`).
pub fn parse_version(raw: &str) -> Result<Version, ApiError> {
    let trimmed = raw.trim().trim_start_matches('v');
    let core_len = trimmed
        .find(|c| c == '-' || c == '+')
        .unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(core_len);

    let dots = core.matches('.').count();
    let padded = match dots {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).map_err(|e| ApiError::Decode(format!("version `{raw}`: {e}")))
}

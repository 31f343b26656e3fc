//! Semantic version helpers for chart and release versions

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),
}

/// Parse a plain `MAJOR.MINOR.PATCH` triplet
///
/// Surrounding whitespace is ignored. Pre-release and build metadata are
/// rejected: chart versions are bumped as bare numeric triplets.
pub fn parse_version(version: &str) -> Result<semver::Version, VersionError> {
    let trimmed = version.trim();
    let invalid = || VersionError::InvalidVersionFormat(version.to_string());

    let parsed = semver::Version::parse(trimmed).map_err(|_| invalid())?;
    if !parsed.pre.is_empty() || !parsed.build.is_empty() {
        return Err(invalid());
    }
    Ok(parsed)
}

/// Bump the patch component, e.g. `1.2.3` -> `1.2.4`
pub fn increment_patch_version(version: &str) -> Result<String, VersionError> {
    let current = parse_version(version)?;
    let next = semver::Version::new(current.major, current.minor, current.patch + 1);
    Ok(next.to_string())
}

//! Release decision produced by the release engine

use crate::core::{
    environment::Environment,
    version::{parse_version, VersionError},
};
use serde::{Deserialize, Serialize};

/// Outcome of analyzing the commit history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDecision {
    /// Version to release, if any release-triggering commits were found
    #[serde(rename = "next_release", default)]
    pub next_version: Option<String>,

    /// Most recent released version
    #[serde(rename = "last_release")]
    pub last_version: String,
}

impl ReleaseDecision {
    pub fn new(next_version: Option<String>, last_version: impl Into<String>) -> Self {
        Self {
            next_version,
            last_version: last_version.into(),
        }
    }

    /// The next version, treating an empty string as absent
    pub fn next(&self) -> Option<&str> {
        self.next_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Refine `latest_stable` into `stable` or `latest`
///
/// Returns `None` for every other environment: the run keeps its
/// classification and no version is resolved.
///
/// The resolved version must be a bare `MAJOR.MINOR.PATCH` triplet.
/// Pre-release or build suffixes (`2.0.0-beta.1`) are rejected with
/// `InvalidVersionFormat`; releases are only cut from the main branch.
pub fn resolve_release_version(
    env: Environment,
    decision: &ReleaseDecision,
) -> Result<Option<(Environment, String)>, VersionError> {
    if env != Environment::LatestStable {
        return Ok(None);
    }

    let (env, version) = match decision.next() {
        Some(next) => (Environment::Stable, next.to_string()),
        None => (Environment::Latest, decision.last_version.trim().to_string()),
    };

    parse_version(&version)?;

    Ok(Some((env, version)))
}

//! Environment classification for a pipeline run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Branch that is eligible for a release engine run
pub const MAIN_BRANCH: &str = "main";

/// Classification of the current run
///
/// Exactly one value is active at a time and transitions only move forward:
///
/// ```text
/// none -> {ci, local} -> {latest_stable, review} -> {stable, latest}
/// ```
///
/// Only `stable`, `latest` and `review` produce publish tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// A new release version was computed on the main branch
    Stable,
    /// Main branch build without a new release version
    Latest,
    /// Any branch other than main
    Review,
    /// No CI credential was supplied
    Local,
    /// On main, waiting for the release engine to decide stable vs latest
    LatestStable,
    /// A CI credential was supplied
    Ci,
    /// Nothing classified yet
    #[default]
    None,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Stable => "stable",
            Environment::Latest => "latest",
            Environment::Review => "review",
            Environment::Local => "local",
            Environment::LatestStable => "latest_stable",
            Environment::Ci => "ci",
            Environment::None => "none",
        }
    }

    /// Whether tags are computed for this environment
    pub fn is_tagging(&self) -> bool {
        matches!(
            self,
            Environment::Stable | Environment::Latest | Environment::Review
        )
    }

    /// Whether this is one of the intermediate labels that are always superseded
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            Environment::LatestStable | Environment::Ci | Environment::Local | Environment::None
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Environment::Stable),
            "latest" => Ok(Environment::Latest),
            "review" => Ok(Environment::Review),
            "local" => Ok(Environment::Local),
            "latest_stable" => Ok(Environment::LatestStable),
            "ci" => Ok(Environment::Ci),
            "none" => Ok(Environment::None),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

/// Where the run is executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Ci,
    Local,
}

/// What kind of branch is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Main,
    Review,
}

impl Origin {
    pub fn detect(credentials_present: bool) -> Self {
        if credentials_present {
            Origin::Ci
        } else {
            Origin::Local
        }
    }
}

impl BranchKind {
    pub fn detect(branch: &str, main_branch: &str) -> Self {
        if branch == main_branch {
            BranchKind::Main
        } else {
            BranchKind::Review
        }
    }
}

impl From<Origin> for Environment {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Ci => Environment::Ci,
            Origin::Local => Environment::Local,
        }
    }
}

impl From<BranchKind> for Environment {
    fn from(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Main => Environment::LatestStable,
            BranchKind::Review => Environment::Review,
        }
    }
}

/// `ci` when a credential is present, `local` otherwise
pub fn classify_ci_or_local(credentials_present: bool) -> Environment {
    Origin::detect(credentials_present).into()
}

/// `latest_stable` on the main branch, `review` anywhere else
///
/// The current environment is replaced, not merged: a `ci` or `local`
/// classification does not survive this transition.
pub fn classify_branch(branch: &str, _current: Environment) -> Environment {
    classify_branch_with_main(branch, MAIN_BRANCH)
}

/// Same as [`classify_branch`] with a configurable main branch name
pub fn classify_branch_with_main(branch: &str, main_branch: &str) -> Environment {
    BranchKind::detect(branch, main_branch).into()
}

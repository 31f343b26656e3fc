//! Error types for pipeline runs and external collaborators

use crate::core::{environment::Environment, version::VersionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of an external tool invocation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}: {stderr}")]
    Exit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("Failed to decode output of `{0}`")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Phases of a release pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Test,
    Classify,
    Build,
    Release,
    Tag,
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Test => "test",
            Phase::Classify => "classify",
            Phase::Build => "build",
            Phase::Release => "release",
            Phase::Tag => "tag",
            Phase::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Error that aborts a release pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Tests failed: {0}")]
    TestFailure(#[source] ServiceError),

    #[error("Image build failed: {0}")]
    Build(#[source] ServiceError),

    #[error("Release computation failed: {0}")]
    ReleaseComputation(#[source] ServiceError),

    #[error("Failed to publish tag '{tag}': {source}")]
    Publish {
        tag: String,
        /// Tags that were already pushed before the failure
        published: Vec<String>,
        #[source]
        source: ServiceError,
    },

    #[error("Environment '{0}' requires a resolved version")]
    MissingVersion(Environment),
}

impl PipelineError {
    /// The phase that produced this error
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::TestFailure(_) => Phase::Test,
            PipelineError::Build(_) => Phase::Build,
            PipelineError::ReleaseComputation(_) | PipelineError::InvalidVersionFormat(_) => {
                Phase::Release
            }
            PipelineError::MissingVersion(_) => Phase::Tag,
            PipelineError::Publish { .. } => Phase::Publish,
        }
    }
}

impl From<VersionError> for PipelineError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::InvalidVersionFormat(v) => PipelineError::InvalidVersionFormat(v),
        }
    }
}

/// Error raised while bumping a chart in a remote repository
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid values: {0}")]
    InvalidValues(String),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("git: {0}")]
    Git(#[source] ServiceError),

    #[error("Failed to edit {file}: {source}")]
    Edit {
        file: String,
        #[source]
        source: ServiceError,
    },
}

//! Pipeline context - state owned by a single run

use crate::core::{
    environment::{BranchKind, Environment, Origin},
    release::ReleaseDecision,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inputs describing the revision being built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInputs {
    /// Whether a CI credential was supplied
    pub credentials_present: bool,

    /// Branch name, already safe to embed in a tag
    pub branch: String,

    /// Commit hash, already safe to embed in a tag
    pub commit_hash: String,
}

/// Execution context for a pipeline run
///
/// Created once per run, advanced phase by phase, and discarded at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current classification, starts at `none`
    pub environment: Environment,

    /// Whether a CI credential was supplied
    pub credentials_present: bool,

    pub branch: String,

    pub commit_hash: String,

    /// CI-vs-local axis, kept after branch classification overwrites `environment`
    pub origin: Option<Origin>,

    /// Main-vs-review axis
    pub branch_kind: Option<BranchKind>,

    /// Present only when the release engine was invoked
    pub release_decision: Option<ReleaseDecision>,

    /// Resolved release version once known
    pub version: Option<String>,

    /// Final publish tags, empty until computed
    pub tags: Vec<String>,
}

impl PipelineContext {
    /// Create a new context in the `none` state
    pub fn new(inputs: RunInputs) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            environment: Environment::None,
            credentials_present: inputs.credentials_present,
            branch: inputs.branch,
            commit_hash: inputs.commit_hash,
            origin: None,
            branch_kind: None,
            release_decision: None,
            version: None,
            tags: Vec::new(),
        }
    }

    /// Run originates from CI and builds the main branch
    pub fn release_eligible(&self) -> bool {
        self.origin == Some(Origin::Ci) && self.branch_kind == Some(BranchKind::Main)
    }

    /// The tag shown first in reports
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// An image pushed under one tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImage {
    pub tag: String,
    pub uri: String,
}

/// Successful outcome of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub environment: Environment,
    pub origin: Option<Origin>,
    pub version: Option<String>,
    pub tags: Vec<String>,
    pub published: Vec<PublishedImage>,
}

impl PipelineResult {
    pub fn from_context(context: PipelineContext, published: Vec<PublishedImage>) -> Self {
        Self {
            run_id: context.run_id,
            environment: context.environment,
            origin: context.origin,
            version: context.version,
            tags: context.tags,
            published,
        }
    }

    /// Nothing was published because the environment produces no tags
    pub fn is_noop(&self) -> bool {
        self.tags.is_empty()
    }
}

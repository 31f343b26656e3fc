//! External collaborators driven by the pipeline
//!
//! Each collaborator is a trait so the engine can be exercised with mocks;
//! the default implementations shell out to existing CLIs.

pub mod docker;
pub mod git;
pub mod process;
pub mod semantic_release;
pub mod test_runner;
pub mod yaml_editor;

use crate::core::{ReleaseDecision, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use docker::DockerCli;
pub use git::GitCli;
pub use process::ToolCommand;
pub use semantic_release::SemanticRelease;
pub use test_runner::{NoopTestRunner, ShellTestRunner};
pub use yaml_editor::{SerdeYamlEditor, YqEditor};

/// User name and token for the registry and the git host
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<String>, token: Option<String>) -> Self {
        Self {
            username,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_present(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A locally built image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    /// Local image reference, e.g. `release-pipeline/<run>:build`
    pub reference: String,
}

/// Builds images and pushes them to a registry
#[async_trait]
pub trait ContainerBuildService: Send + Sync {
    async fn build(&self, source_dir: &Path) -> Result<ImageHandle, ServiceError>;

    /// Push `image` as `{registry_path}:{tag}` and return the pushed reference
    async fn publish(
        &self,
        image: &ImageHandle,
        registry_path: &str,
        tag: &str,
        credentials: &Credentials,
    ) -> Result<String, ServiceError>;
}

/// Computes the next release from the commit history
#[async_trait]
pub trait ReleaseEngine: Send + Sync {
    async fn compute_next_release(
        &self,
        source_dir: &Path,
        credentials: &Credentials,
        repository_url: Option<&str>,
    ) -> Result<ReleaseDecision, ServiceError>;
}

/// Runs the project's tests before anything is built
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, source_dir: &Path) -> Result<(), ServiceError>;
}

/// Applies dotted key paths to a structured text file in place
#[async_trait]
pub trait ConfigFileEditor: Send + Sync {
    /// Read the scalar at `key` (e.g. `version` or `image.tag`)
    async fn read_value(&self, file: &Path, key: &str) -> Result<String, ServiceError>;

    /// Set every `(key, value)` pair, in order, as a string
    async fn apply(&self, file: &Path, values: &[(String, String)]) -> Result<(), ServiceError>;
}

//! release-pipeline - container image and Helm chart release automation

pub mod cli;
pub mod core;
pub mod execution;
pub mod services;

// Re-export commonly used types
pub use core::{Environment, PipelineContext, PipelineError, PipelineResult, ReleaseDecision, RunInputs};
pub use execution::{ChartUpdater, PipelineEngine, PipelineEvent};
pub use services::{ContainerBuildService, ConfigFileEditor, Credentials, ReleaseEngine, TestRunner};

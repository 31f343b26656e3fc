//! CLI command definitions

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Build, tag and publish a container image
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Source directory (overrides `source_dir`)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// GitHub token; its presence marks the run as CI
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub / registry user name
    #[arg(long, env = "GITHUB_ACTOR")]
    pub username: Option<String>,

    /// Branch being built (default: current git branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Commit being built (default: current short HEAD)
    #[arg(long)]
    pub commit_hash: Option<String>,

    /// Registry repository, e.g. ghcr.io/org/app
    #[arg(long)]
    pub registry_path: Option<String>,

    /// Repository URL passed to the release engine
    #[arg(long)]
    pub repository_url: Option<String>,

    /// Branch that triggers releases
    #[arg(long)]
    pub main_branch: Option<String>,

    /// Shell command run before building
    #[arg(long)]
    pub test_command: Option<String>,

    /// Dockerfile path relative to the source directory
    #[arg(long)]
    pub dockerfile: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Bump a Helm chart and its values in a remote repository
#[derive(Debug, Args, Clone)]
pub struct UpdateChartCommand {
    /// JSON object with the values to set, must contain app_name and app_version
    #[arg(long)]
    pub values_json: String,

    /// GitHub token used to clone and push
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository containing the chart, e.g. https://github.com/org/charts.git
    #[arg(long)]
    pub helm_repo_url: String,

    /// Branch to update
    #[arg(long)]
    pub branch: String,

    /// Values file relative to the chart directory
    #[arg(long, default_value = "values.yaml")]
    pub values_file: String,

    /// Chart directory containing Chart.yaml
    #[arg(long, default_value = ".")]
    pub chart_path: String,

    /// How YAML files are edited
    #[arg(long, value_enum, default_value_t = EditorArg::Yq)]
    pub editor: EditorArg,
}

/// Compute the next release version without building anything
#[derive(Debug, Args, Clone)]
pub struct NextReleaseCommand {
    /// Source directory (overrides `source_dir`)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// GitHub token; without it semantic-release runs in dry-run mode
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub user name
    #[arg(long, env = "GITHUB_ACTOR")]
    pub username: Option<String>,

    /// Repository URL passed to semantic-release
    #[arg(long)]
    pub repository_url: Option<String>,
}

/// Show the environment and tags a run would produce
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Branch being built
    #[arg(long)]
    pub branch: String,

    /// Commit being built
    #[arg(long)]
    pub commit_hash: String,

    /// Treat the run as CI
    #[arg(long)]
    pub ci: bool,

    /// Next release version reported by the release engine
    #[arg(long)]
    pub next_release: Option<String>,

    /// Last released version
    #[arg(long, default_value = "0.0.0")]
    pub last_release: String,

    /// Branch that triggers releases (overrides `main_branch`)
    #[arg(long)]
    pub main_branch: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// YAML editing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EditorArg {
    /// mikefarah yq, preserves comments
    Yq,
    /// Built-in serde_yaml editor, no external tool needed
    Builtin,
}

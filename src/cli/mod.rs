//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{NextReleaseCommand, PlanCommand, RunCommand, UpdateChartCommand};
use std::ffi::OsString;

/// Release automation for container images and Helm charts
#[derive(Debug, Parser, Clone)]
#[command(name = "release-pipeline")]
#[command(version)]
#[command(about = "Build, tag and publish container images and bump Helm charts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to pipeline configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the release pipeline
    Run(RunCommand),

    /// Bump a Helm chart in a remote repository
    UpdateChart(UpdateChartCommand),

    /// Print the next release computed by semantic-release
    NextRelease(NextReleaseCommand),

    /// Show the environment and tags without building
    Plan(PlanCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

//! Test Runner implementations

use crate::core::ServiceError;
use crate::services::{TestRunner, ToolCommand};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Runs a shell command, e.g. `cargo test` or `npm test`
#[derive(Debug, Clone)]
pub struct ShellTestRunner {
    command: String,
    timeout_secs: u64,
}

impl ShellTestRunner {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl TestRunner for ShellTestRunner {
    async fn run(&self, source_dir: &Path) -> Result<(), ServiceError> {
        info!("Running tests: {}", self.command);
        ToolCommand::new("sh")
            .args(["-c", self.command.as_str()])
            .current_dir(source_dir)
            .timeout(self.timeout_secs)
            .output()
            .await?;
        Ok(())
    }
}

/// Used when no test command is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTestRunner;

#[async_trait]
impl TestRunner for NoopTestRunner {
    async fn run(&self, _source_dir: &Path) -> Result<(), ServiceError> {
        info!("No test command configured, skipping tests");
        Ok(())
    }
}

#[async_trait]
impl<T: TestRunner + ?Sized> TestRunner for Box<T> {
    async fn run(&self, source_dir: &Path) -> Result<(), ServiceError> {
        (**self).run(source_dir).await
    }
}

/// Shell runner when a command is configured, no-op otherwise
pub fn from_command(command: Option<&str>, timeout_secs: u64) -> Box<dyn TestRunner> {
    match command {
        Some(cmd) => Box::new(ShellTestRunner::new(cmd, timeout_secs)),
        None => Box::new(NoopTestRunner),
    }
}

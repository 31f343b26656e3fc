//! Release Engine backed by semantic-release

use crate::core::{ReleaseDecision, ServiceError, MAIN_BRANCH};
use crate::services::{Credentials, ReleaseEngine, ToolCommand};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const NEXT_RELEASE_FILE: &str = "next-release.txt";
const LAST_RELEASE_FILE: &str = "last-release.txt";

/// Last version reported when the repository has never been released
pub const INITIAL_VERSION: &str = "0.0.0";

/// Generated `.releaserc` contents
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRc {
    pub branches: Vec<String>,
    pub plugins: Vec<Value>,
    pub dry_run: bool,
    pub debug: bool,
    pub ci: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
}

impl ReleaseRc {
    /// Configuration that records the last and next versions into `output_dir`
    pub fn new(branch: &str, output_dir: &Path, ci: bool, repository_url: Option<&str>) -> Self {
        let last_file = output_dir.join(LAST_RELEASE_FILE);
        let next_file = output_dir.join(NEXT_RELEASE_FILE);

        let mut plugins = vec![
            json!("@semantic-release/commit-analyzer"),
            json!("@semantic-release/release-notes-generator"),
            json!([
                "@semantic-release/exec",
                {
                    "analyzeCommitsCmd": format!("echo ${{lastRelease.version}} > {}", last_file.display()),
                    "verifyReleaseCmd": format!("echo ${{nextRelease.version}} > {}", next_file.display()),
                }
            ]),
        ];
        if ci {
            plugins.push(json!(["@semantic-release/github", { "addReleases": "top" }]));
        }

        Self {
            branches: vec![branch.to_string()],
            plugins,
            dry_run: !ci,
            debug: !ci,
            ci,
            repository_url: repository_url.map(str::to_string),
        }
    }
}

/// Runs `npx semantic-release` against the source checkout
#[derive(Debug, Clone)]
pub struct SemanticRelease {
    npx_path: String,
    branch: String,
    timeout_secs: u64,
    work_root: PathBuf,
}

impl SemanticRelease {
    pub fn new() -> Self {
        let work_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("release-pipeline")
            .join("semantic-release");
        Self {
            npx_path: "npx".to_string(),
            branch: MAIN_BRANCH.to_string(),
            timeout_secs: crate::services::process::DEFAULT_TIMEOUT_SECS,
            work_root,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_npx_path(mut self, path: impl Into<String>) -> Self {
        self.npx_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = dir.into();
        self
    }

    fn command(&self, source_dir: &Path, rc_path: &Path, credentials: &Credentials) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.npx_path)
            .args(["semantic-release", "--extends"])
            .arg(rc_path.to_string_lossy())
            .current_dir(source_dir)
            .timeout(self.timeout_secs);

        match &credentials.token {
            Some(token) => {
                let username = credentials.username.clone().unwrap_or_default();
                cmd = cmd
                    .env("GITHUB_TOKEN", token.as_str())
                    .env("GITHUB_USERNAME", username.as_str())
                    .env("GITHUB_ACTOR", username.as_str())
                    .env("GITHUB_REF", format!("refs/heads/{}", self.branch))
                    .env("GITHUB_ACTIONS", "true")
                    .secret(token.as_str());
            }
            None => {
                cmd = cmd.args(["--dry-run", "--no-ci"]);
            }
        }
        cmd
    }
}

impl Default for SemanticRelease {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a version file written by the exec plugin, treating blanks as absent
fn read_version_file(path: &Path) -> Result<Option<String>, ServiceError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Config files semantic-release loads from the project, ahead of `--extends`
const PROJECT_CONFIG_FILES: &[&str] = &[
    ".releaserc",
    ".releaserc.json",
    ".releaserc.yaml",
    ".releaserc.yml",
    ".releaserc.js",
    ".releaserc.cjs",
    ".releaserc.mjs",
    "release.config.js",
    "release.config.cjs",
    "release.config.mjs",
];

/// The project's own semantic-release configuration, if it has one
pub fn project_release_config(source_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = PROJECT_CONFIG_FILES
        .iter()
        .map(|name| source_dir.join(name))
        .find(|path| path.is_file())
    {
        return Some(path);
    }

    let manifest = source_dir.join("package.json");
    let content = std::fs::read_to_string(&manifest).ok()?;
    let package: Value = serde_json::from_str(&content).ok()?;
    package.get("release").is_some().then_some(manifest)
}

/// Turn the files left by a semantic-release run into a decision
///
/// The last-release file is written on every analyzed run, empty before the
/// first release. When it is missing the exec hooks never ran, usually
/// because a project config replaced the generated plugin list.
pub fn read_decision(output_dir: &Path, source_dir: &Path) -> Result<ReleaseDecision, ServiceError> {
    let last_file = output_dir.join(LAST_RELEASE_FILE);
    if !last_file.exists() {
        let reason = match project_release_config(source_dir) {
            Some(config) => format!(
                "{} overrides the generated plugins, add @semantic-release/exec or remove it",
                config.display()
            ),
            None => "no version was recorded".to_string(),
        };
        return Err(ServiceError::Other(format!(
            "semantic-release did not report the last release: {}",
            reason
        )));
    }

    let next = read_version_file(&output_dir.join(NEXT_RELEASE_FILE))?;
    let last = read_version_file(&last_file)?.unwrap_or_else(|| INITIAL_VERSION.to_string());
    Ok(ReleaseDecision::new(next, last))
}

#[async_trait]
impl ReleaseEngine for SemanticRelease {
    async fn compute_next_release(
        &self,
        source_dir: &Path,
        credentials: &Credentials,
        repository_url: Option<&str>,
    ) -> Result<ReleaseDecision, ServiceError> {
        let ci = credentials.is_present();
        if !ci {
            info!("No GitHub token, running semantic-release in dry-run mode");
        }
        if let Some(config) = project_release_config(source_dir) {
            warn!(
                "{} takes precedence over the generated release config",
                config.display()
            );
        }

        let output_dir = self.work_root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&output_dir)?;

        let rc = ReleaseRc::new(&self.branch, &output_dir, ci, repository_url);
        let rc_path = output_dir.join("releaserc.json");
        let rc_json = serde_json::to_string_pretty(&rc)
            .map_err(|e| ServiceError::Other(format!("Failed to render releaserc: {}", e)))?;
        std::fs::write(&rc_path, &rc_json)?;
        debug!("Configured release parameters: {}", rc_json);

        let result = self.command(source_dir, &rc_path, credentials).output().await;
        let decision = result.and_then(|_| read_decision(&output_dir, source_dir));

        if let Err(e) = std::fs::remove_dir_all(&output_dir) {
            debug!("Failed to clean up {}: {}", output_dir.display(), e);
        }

        let decision = decision?;
        info!(
            "Release decision: next={:?} last={}",
            decision.next_version, decision.last_version
        );
        Ok(decision)
    }
}

//! Git operations via the system git binary

use crate::core::ServiceError;
use crate::services::ToolCommand;
use std::path::Path;
use tracing::info;

/// Identity used for automated commits
pub const BOT_NAME: &str = "github-actions[bot]";
pub const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

/// `owner/repo` from a repository URL, e.g. `https://github.com/acme/charts.git`
pub fn owner_and_repo(repo_url: &str) -> Option<(&str, &str)> {
    let trimmed = repo_url.trim_end_matches('/');
    let mut segments = trimmed.rsplit(['/', ':']);
    let repo = segments.next()?;
    let owner = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// Host of an `https://` or `git@host:` URL, without any user info
pub fn remote_host(repo_url: &str) -> Option<&str> {
    let host = if let Some(rest) = repo_url
        .strip_prefix("https://")
        .or_else(|| repo_url.strip_prefix("http://"))
    {
        let authority = rest.split('/').next()?;
        authority.rsplit('@').next()?
    } else {
        let (user_host, _) = repo_url.split_once(':')?;
        user_host.split_once('@')?.1
    };
    (!host.is_empty()).then_some(host)
}

/// Clone and push URL carrying the token, as GitHub expects for installation tokens
///
/// The host of `repo_url` is kept. Local paths yield `None`.
pub fn authenticated_remote(repo_url: &str, token: &str) -> Option<String> {
    let host = remote_host(repo_url)?;
    let (owner, repo) = owner_and_repo(repo_url)?;
    Some(format!(
        "https://x-access-token:{}@{}/{}/{}.git",
        token, host, owner, repo
    ))
}

/// Thin wrapper around `git` subcommands
#[derive(Debug, Clone)]
pub struct GitCli {
    git_path: String,
    timeout_secs: u64,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            git_path: "git".to_string(),
            timeout_secs: 600,
        }
    }

    pub fn with_git_path(mut self, path: impl Into<String>) -> Self {
        self.git_path = path.into();
        self
    }

    fn git(&self, repo_dir: &Path) -> ToolCommand {
        ToolCommand::new(&self.git_path)
            .arg("-C")
            .arg(repo_dir.to_string_lossy())
            .timeout(self.timeout_secs)
    }

    /// Clone `branch` of `url` into `dest`, masking `secret` in logs
    pub async fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        secret: Option<&str>,
    ) -> Result<(), ServiceError> {
        info!("Cloning branch {} into {}", branch, dest.display());
        ToolCommand::new(&self.git_path)
            .args(["clone", "--branch", branch, url])
            .arg(dest.to_string_lossy())
            .secret(secret.unwrap_or_default())
            .timeout(self.timeout_secs)
            .output()
            .await?;
        Ok(())
    }

    /// Set the commit identity for this repository only
    pub async fn configure_identity(&self, repo_dir: &Path, name: &str, email: &str) -> Result<(), ServiceError> {
        self.git(repo_dir).args(["config", "user.name", name]).output().await?;
        self.git(repo_dir).args(["config", "user.email", email]).output().await?;
        Ok(())
    }

    pub async fn set_remote_url(&self, repo_dir: &Path, remote: &str, url: &str, secret: &str) -> Result<(), ServiceError> {
        self.git(repo_dir)
            .args(["remote", "set-url", remote, url])
            .secret(secret)
            .output()
            .await?;
        Ok(())
    }

    pub async fn add_all(&self, repo_dir: &Path) -> Result<(), ServiceError> {
        self.git(repo_dir).args(["add", "."]).output().await?;
        Ok(())
    }

    pub async fn commit(&self, repo_dir: &Path, message: &str) -> Result<(), ServiceError> {
        self.git(repo_dir).args(["commit", "-m", message]).output().await?;
        Ok(())
    }

    pub async fn push(&self, repo_dir: &Path, remote: &str, branch: &str, secret: Option<&str>) -> Result<(), ServiceError> {
        info!("Pushing to {} {}", remote, branch);
        self.git(repo_dir)
            .args(["push", remote, branch])
            .secret(secret.unwrap_or_default())
            .output()
            .await?;
        Ok(())
    }

    /// Current branch name, `HEAD` when detached
    pub async fn current_branch(&self, repo_dir: &Path) -> Result<String, ServiceError> {
        let out = self.git(repo_dir).args(["rev-parse", "--abbrev-ref", "HEAD"]).output().await?;
        Ok(out.trim().to_string())
    }

    /// Abbreviated HEAD commit hash
    pub async fn short_commit(&self, repo_dir: &Path) -> Result<String, ServiceError> {
        let out = self.git(repo_dir).args(["rev-parse", "--short", "HEAD"]).output().await?;
        Ok(out.trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

//! Chart updater - bumps a Helm chart in a remote repository

use crate::core::{version::increment_patch_version, ChartError};
use crate::services::{
    git::{authenticated_remote, BOT_EMAIL, BOT_NAME},
    ConfigFileEditor, GitCli,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_VALUES_FILE: &str = "values.yaml";
pub const DEFAULT_CHART_PATH: &str = ".";

/// Values to write, parsed from a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct ChartValues {
    pub app_name: String,
    pub app_version: String,
    values: Map<String, Value>,
}

impl ChartValues {
    /// Parse a JSON object that carries at least `app_name` and `app_version`
    pub fn parse(json: &str) -> Result<Self, ChartError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ChartError::InvalidValues(format!("not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ChartError> {
        let Value::Object(values) = value else {
            return Err(ChartError::InvalidValues("expected a JSON object".to_string()));
        };

        let required = |key: &str| -> Result<String, ChartError> {
            match values.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
                Some(_) => Err(ChartError::InvalidValues(format!("'{}' must be a non-empty string", key))),
                None => Err(ChartError::InvalidValues(format!("missing '{}'", key))),
            }
        };

        let app_name = required("app_name")?;
        let app_version = required("app_version")?;
        Ok(Self {
            app_name,
            app_version,
            values,
        })
    }

    /// Every leaf as a `(dotted.key, value)` pair, sorted by key within each level
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flatten_into(&self.values, "", &mut pairs);
        pairs
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, pairs: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let path = format!("{}{}", prefix, key);
        match value {
            Value::Object(nested) => flatten_into(nested, &format!("{}.", path), pairs),
            Value::String(s) => pairs.push((path, s.clone())),
            other => pairs.push((path, other.to_string())),
        }
    }
}

/// Where the chart lives and which branch to update
#[derive(Debug, Clone)]
pub struct ChartUpdateRequest {
    pub values: ChartValues,
    pub token: Option<String>,
    pub repo_url: String,
    pub branch: String,
    pub values_file: String,
    pub chart_path: String,
}

impl ChartUpdateRequest {
    pub fn new(values: ChartValues, repo_url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            values,
            token: None,
            repo_url: repo_url.into(),
            branch: branch.into(),
            values_file: DEFAULT_VALUES_FILE.to_string(),
            chart_path: DEFAULT_CHART_PATH.to_string(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Blank values fall back to `values.yaml`
    pub fn with_values_file(mut self, values_file: impl Into<String>) -> Self {
        let values_file = values_file.into();
        if !values_file.trim().is_empty() {
            self.values_file = values_file;
        }
        self
    }

    /// Blank values fall back to the repository root
    pub fn with_chart_path(mut self, chart_path: impl Into<String>) -> Self {
        let chart_path = chart_path.into();
        if !chart_path.trim().is_empty() {
            self.chart_path = chart_path;
        }
        self
    }

    pub fn commit_message(&self, new_chart_version: &str) -> String {
        format!(
            "Update {}:{} chart version to {}",
            self.values.app_name, self.values.app_version, new_chart_version
        )
    }
}

/// What an update changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartUpdateOutcome {
    pub previous_version: String,
    pub new_version: String,
    pub app_version: String,
    pub commit_message: String,
}

/// Clones, edits, commits and pushes a chart repository
pub struct ChartUpdater<E> {
    git: GitCli,
    editor: E,
    work_root: PathBuf,
}

impl<E: ConfigFileEditor> ChartUpdater<E> {
    pub fn new(git: GitCli, editor: E) -> Self {
        let work_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("release-pipeline")
            .join("charts");
        Self {
            git,
            editor,
            work_root,
        }
    }

    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = dir.into();
        self
    }

    /// Run the update in a fresh clone, removed afterwards
    pub async fn update(&self, request: &ChartUpdateRequest) -> Result<ChartUpdateOutcome, ChartError> {
        let repo_dir = self.work_root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&self.work_root).map_err(|e| ChartError::Git(e.into()))?;

        let result = self.update_in(request, &repo_dir).await;

        if repo_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&repo_dir) {
                debug!("Failed to clean up {}: {}", repo_dir.display(), e);
            }
        }
        result
    }

    async fn update_in(&self, request: &ChartUpdateRequest, repo_dir: &Path) -> Result<ChartUpdateOutcome, ChartError> {
        let token = request.token.as_deref();
        let push_url = token.and_then(|t| authenticated_remote(&request.repo_url, t));
        if token.is_some() && push_url.is_none() {
            warn!("Cannot build an authenticated URL for {}, using it as is", request.repo_url);
        }

        let clone_url = push_url.as_deref().unwrap_or(&request.repo_url);
        self.git
            .clone_branch(clone_url, &request.branch, repo_dir, token)
            .await
            .map_err(ChartError::Git)?;
        self.git
            .configure_identity(repo_dir, BOT_NAME, BOT_EMAIL)
            .await
            .map_err(ChartError::Git)?;

        let chart_dir = repo_dir.join(&request.chart_path);
        let chart_yaml = chart_dir.join("Chart.yaml");
        let values_file = chart_dir.join(&request.values_file);

        let previous_version = self
            .editor
            .read_value(&chart_yaml, "version")
            .await
            .map_err(|source| edit_error(&chart_yaml, source))?;
        let new_version = increment_patch_version(&previous_version)?;
        info!("Chart version {} -> {}", previous_version.trim(), new_version);

        self.editor
            .apply(
                &chart_yaml,
                &[
                    ("version".to_string(), new_version.clone()),
                    ("appVersion".to_string(), request.values.app_version.clone()),
                ],
            )
            .await
            .map_err(|source| edit_error(&chart_yaml, source))?;

        let pairs = request.values.flatten();
        debug!("Applying {} values to {}", pairs.len(), values_file.display());
        self.editor
            .apply(&values_file, &pairs)
            .await
            .map_err(|source| edit_error(&values_file, source))?;

        if let (Some(url), Some(secret)) = (push_url.as_deref(), token) {
            self.git
                .set_remote_url(repo_dir, "origin", url, secret)
                .await
                .map_err(ChartError::Git)?;
        }

        let commit_message = request.commit_message(&new_version);
        self.git.add_all(repo_dir).await.map_err(ChartError::Git)?;
        self.git
            .commit(repo_dir, &commit_message)
            .await
            .map_err(ChartError::Git)?;
        self.git
            .push(repo_dir, "origin", &request.branch, token)
            .await
            .map_err(ChartError::Git)?;

        Ok(ChartUpdateOutcome {
            previous_version: previous_version.trim().to_string(),
            new_version,
            app_version: request.values.app_version.clone(),
            commit_message,
        })
    }
}

fn edit_error(file: &Path, source: crate::core::ServiceError) -> ChartError {
    ChartError::Edit {
        file: file.display().to_string(),
        source,
    }
}

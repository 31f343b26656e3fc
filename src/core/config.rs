//! Pipeline configuration from YAML

use crate::core::environment::MAIN_BRANCH;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory containing the Dockerfile and the git checkout
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Dockerfile path, relative to `source_dir`
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,

    /// Registry repository images are pushed to, e.g. `ghcr.io/org/app`
    #[serde(default)]
    pub registry_path: Option<String>,

    /// Registry and release engine user
    #[serde(default)]
    pub username: Option<String>,

    /// Repository analyzed by the release engine
    #[serde(default)]
    pub repository_url: Option<String>,

    /// Branch that triggers release engine runs
    #[serde(default = "default_main_branch")]
    pub main_branch: String,

    /// Shell command run before the image is built
    #[serde(default)]
    pub test_command: Option<String>,

    /// Per-phase timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Timeouts for external tools (in seconds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_secs")]
    pub test_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub build_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub release_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub publish_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            test_secs: default_timeout_secs(),
            build_secs: default_timeout_secs(),
            release_secs: default_timeout_secs(),
            publish_secs: default_timeout_secs(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

fn default_main_branch() -> String {
    MAIN_BRANCH.to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            dockerfile: default_dockerfile(),
            registry_path: None,
            username: None,
            repository_url: None,
            main_branch: default_main_branch(),
            test_command: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.main_branch.trim().is_empty() {
            anyhow::bail!("main_branch must not be empty");
        }

        if let Some(registry) = &self.registry_path {
            if registry.is_empty() || registry.chars().any(char::is_whitespace) {
                anyhow::bail!("Invalid registry_path: '{}'", registry);
            }
            // `host:port/repo` is fine, `repo:tag` is not
            let last_segment = registry.rsplit('/').next().unwrap_or(registry);
            if registry.contains('/') && last_segment.contains(':') {
                anyhow::bail!(
                    "registry_path '{}' must not include a tag, tags are computed per run",
                    registry
                );
            }
        }

        if let Some(cmd) = &self.test_command {
            if cmd.trim().is_empty() {
                anyhow::bail!("test_command must not be blank");
            }
        }

        let t = &self.timeouts;
        if [t.test_secs, t.build_secs, t.release_secs, t.publish_secs].contains(&0) {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        Ok(())
    }

    /// The registry path, required once something is published
    pub fn require_registry_path(&self) -> Result<&str> {
        self.registry_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("registry_path is not configured (use --registry-path)"))
    }
}

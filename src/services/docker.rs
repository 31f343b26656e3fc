//! Container Build Service backed by the docker CLI

use crate::core::ServiceError;
use crate::services::{ContainerBuildService, Credentials, ImageHandle, ToolCommand};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Builds with `docker build` and publishes with `docker tag` + `docker push`
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker_path: String,
    dockerfile: String,
    build_timeout_secs: u64,
    publish_timeout_secs: u64,
    run_id: Uuid,
}

impl DockerCli {
    pub fn new(dockerfile: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            docker_path: "docker".to_string(),
            dockerfile: dockerfile.into(),
            build_timeout_secs: crate::services::process::DEFAULT_TIMEOUT_SECS,
            publish_timeout_secs: crate::services::process::DEFAULT_TIMEOUT_SECS,
            run_id,
        }
    }

    pub fn with_docker_path(mut self, path: impl Into<String>) -> Self {
        self.docker_path = path.into();
        self
    }

    pub fn with_timeouts(mut self, build_secs: u64, publish_secs: u64) -> Self {
        self.build_timeout_secs = build_secs;
        self.publish_timeout_secs = publish_secs;
        self
    }

    /// Local reference the built image is tagged with
    pub fn local_reference(&self) -> String {
        format!("release-pipeline/{}:build", self.run_id)
    }

    fn build_command(&self, source_dir: &Path) -> ToolCommand {
        let dockerfile = source_dir.join(&self.dockerfile);
        ToolCommand::new(&self.docker_path)
            .args(["build", "-f"])
            .arg(dockerfile.to_string_lossy())
            .args(["-t".to_string(), self.local_reference()])
            .arg(source_dir.to_string_lossy())
            .timeout(self.build_timeout_secs)
    }

    fn login_command(&self, registry_path: &str, username: &str, token: &str) -> ToolCommand {
        ToolCommand::new(&self.docker_path)
            .args(["login", registry_host(registry_path), "-u", username, "--password-stdin"])
            .stdin(token)
            .secret(token)
            .timeout(self.publish_timeout_secs)
    }
}

/// Registry host of a repository path, e.g. `ghcr.io` for `ghcr.io/org/app`
///
/// Paths without an explicit host (`org/app`) belong to Docker Hub.
pub fn registry_host(registry_path: &str) -> &str {
    match registry_path.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => first,
        _ => "docker.io",
    }
}

#[async_trait]
impl ContainerBuildService for DockerCli {
    async fn build(&self, source_dir: &Path) -> Result<ImageHandle, ServiceError> {
        info!("Building image from {}", source_dir.display());
        self.build_command(source_dir).output().await?;
        Ok(ImageHandle {
            reference: self.local_reference(),
        })
    }

    async fn publish(
        &self,
        image: &ImageHandle,
        registry_path: &str,
        tag: &str,
        credentials: &Credentials,
    ) -> Result<String, ServiceError> {
        if let Some(token) = &credentials.token {
            let username = credentials.username.as_deref().unwrap_or("x-access-token");
            self.login_command(registry_path, username, token).output().await?;
        } else {
            debug!("No registry credential, relying on the local docker login");
        }

        let target = format!("{}:{}", registry_path, tag);
        ToolCommand::new(&self.docker_path)
            .args(["tag", image.reference.as_str(), target.as_str()])
            .timeout(self.publish_timeout_secs)
            .output()
            .await?;
        ToolCommand::new(&self.docker_path)
            .args(["push", target.as_str()])
            .timeout(self.publish_timeout_secs)
            .output()
            .await?;

        info!("Pushed {}", target);
        Ok(target)
    }
}

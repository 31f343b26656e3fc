//! Test: chart updates against a local bare repository
//!
//! These tests require `git` on PATH. Run with:
//!
//!     cargo test --test release_scenarios -- --ignored

use release_pipeline::core::{version::VersionError, ChartError};
use release_pipeline::execution::{ChartUpdateRequest, ChartUpdater, ChartValues};
use release_pipeline::services::{GitCli, SerdeYamlEditor};
use std::path::{Path, PathBuf};
use std::process::Command;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .output()
        .expect("git should run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a bare repository whose `main` branch holds a chart under `chart_dir`
fn seed_chart_repo(chart_version: &str, chart_dir: &str) -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir()
        .join("release-pipeline-tests")
        .join(format!("chart-{}", uuid::Uuid::new_v4()));
    let seed = root.join("seed");
    std::fs::create_dir_all(&seed).unwrap();
    let chart = match chart_dir {
        "." => seed.clone(),
        dir => seed.join(dir),
    };
    std::fs::create_dir_all(&chart).unwrap();

    git(&seed, &["init", "-q"]);
    git(&seed, &["checkout", "-q", "-b", "main"]);
    std::fs::write(
        chart.join("Chart.yaml"),
        format!("apiVersion: v2\nname: widget\nversion: {}\nappVersion: \"0.9.0\"\n", chart_version),
    )
    .unwrap();
    std::fs::write(chart.join("values.yaml"), "image:\n  repository: ghcr.io/acme/widget\n  tag: \"0.9.0\"\n").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-q", "-m", "Initial chart"]);

    let bare = root.join("charts.git");
    let status = Command::new("git")
        .args(["clone", "-q", "--bare"])
        .arg(&seed)
        .arg(&bare)
        .status()
        .unwrap();
    assert!(status.success());
    (root, bare)
}

#[tokio::test]
#[ignore] // Requires git
async fn test_update_chart_commits_and_pushes() {
    let (root, bare) = seed_chart_repo("0.1.9", "charts/widget");
    let values = ChartValues::parse(
        r#"{"app_name": "widget", "app_version": "1.2.3", "image": {"tag": "1.2.3"}}"#,
    )
    .unwrap();
    let request = ChartUpdateRequest::new(values, bare.to_string_lossy(), "main")
        .with_chart_path("charts/widget");

    let updater = ChartUpdater::new(GitCli::new(), SerdeYamlEditor).with_work_root(root.join("work"));
    let outcome = updater.update(&request).await.unwrap();

    assert_eq!(outcome.previous_version, "0.1.9");
    assert_eq!(outcome.new_version, "0.1.10");
    assert_eq!(outcome.commit_message, "Update widget:1.2.3 chart version to 0.1.10");

    let chart = git(&bare, &["show", "main:charts/widget/Chart.yaml"]);
    assert!(chart.contains("version: 0.1.10"), "{}", chart);
    assert!(chart.contains("appVersion: 1.2.3"), "{}", chart);

    let values_yaml = git(&bare, &["show", "main:charts/widget/values.yaml"]);
    assert!(values_yaml.contains("tag: 1.2.3"), "{}", values_yaml);
    assert!(values_yaml.contains("app_name: widget"), "{}", values_yaml);
    assert!(values_yaml.contains("repository: ghcr.io/acme/widget"), "{}", values_yaml);

    assert_eq!(git(&bare, &["log", "-1", "--format=%s", "main"]), outcome.commit_message);
    assert_eq!(
        git(&bare, &["log", "-1", "--format=%an", "main"]),
        "github-actions[bot]"
    );

    // The working clone is removed afterwards
    assert_eq!(std::fs::read_dir(root.join("work")).unwrap().count(), 0);
    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
#[ignore] // Requires git
async fn test_invalid_chart_version_pushes_nothing() {
    let (root, bare) = seed_chart_repo("1.0", ".");
    let values = ChartValues::parse(r#"{"app_name": "widget", "app_version": "1.2.3"}"#).unwrap();
    let request = ChartUpdateRequest::new(values, bare.to_string_lossy(), "main");

    let updater = ChartUpdater::new(GitCli::new(), SerdeYamlEditor).with_work_root(root.join("work"));
    let err = updater.update(&request).await.unwrap_err();

    assert!(matches!(
        err,
        ChartError::Version(VersionError::InvalidVersionFormat(ref v)) if v == "1.0"
    ));
    assert_eq!(git(&bare, &["log", "-1", "--format=%s", "main"]), "Initial chart");
    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
#[ignore] // Requires git
async fn test_missing_branch_is_a_git_error() {
    let (root, bare) = seed_chart_repo("0.1.0", ".");
    let values = ChartValues::parse(r#"{"app_name": "widget", "app_version": "1.2.3"}"#).unwrap();
    let request = ChartUpdateRequest::new(values, bare.to_string_lossy(), "does-not-exist");

    let updater = ChartUpdater::new(GitCli::new(), SerdeYamlEditor).with_work_root(root.join("work"));
    let err = updater.update(&request).await.unwrap_err();

    assert!(matches!(err, ChartError::Git(_)));
    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
#[ignore] // Requires git
async fn test_token_with_local_path_uses_url_as_is() {
    let (root, bare) = seed_chart_repo("0.2.0", ".");
    let values = ChartValues::parse(r#"{"app_name": "widget", "app_version": "2.0.0"}"#).unwrap();
    let request = ChartUpdateRequest::new(values, bare.to_string_lossy(), "main")
        .with_token(Some("ghp_token".to_string()));

    let updater = ChartUpdater::new(GitCli::new(), SerdeYamlEditor).with_work_root(root.join("work"));
    let outcome = updater.update(&request).await.unwrap();

    assert_eq!(outcome.new_version, "0.2.1");
    assert_eq!(git(&bare, &["log", "-1", "--format=%s", "main"]), outcome.commit_message);
    std::fs::remove_dir_all(root).unwrap();
}

//! Test: main branch runs resolve to stable or latest

use crate::helpers::*;
use release_pipeline::core::{Origin, Phase};
use release_pipeline::execution::PipelineEvent;
use release_pipeline::Environment;

/// A release-triggering commit on main publishes the version, stable and latest
#[tokio::test]
async fn test_stable_release() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::with_next("1.2.3", "1.2.0");
    let tests = MockTestRunner::passing();

    let run = run_scenario(Some("ghp_token"), "main", "abc123", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Stable);
    assert_eq!(result.version.as_deref(), Some("1.2.3"));
    assert_eq!(result.origin, Some(Origin::Ci));
    assert_tags(&run, &["1.2.3", "stable", "latest"]);

    assert_eq!(builder.published_tags(), vec!["1.2.3", "stable", "latest"]);
    assert_eq!(
        result.published.iter().map(|p| p.uri.as_str()).collect::<Vec<_>>(),
        vec![
            "ghcr.io/acme/widget:1.2.3",
            "ghcr.io/acme/widget:stable",
            "ghcr.io/acme/widget:latest",
        ]
    );
    assert_eq!(release.call_count(), 1);
    assert_eq!(tests.run_count(), 1);
    assert_eq!(builder.build_count(), 1);
}

/// Without a new release the last version is published with commit and timestamp
#[tokio::test]
async fn test_latest_build() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::without_next("1.2.0");
    let tests = MockTestRunner::passing();

    let run = run_scenario(Some("ghp_token"), "main", "abc123", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Latest);
    assert_eq!(result.version.as_deref(), Some("1.2.0"));
    let primary = format!("1.2.0-abc123.{}", fixed_timestamp());
    assert_tags(&run, &[primary.as_str(), "latest"]);
    assert_eq!(builder.published_tags(), vec![primary, "latest".to_string()]);
}

/// Phases and environment transitions happen in the documented order
#[tokio::test]
async fn test_phase_and_transition_order() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::with_next("2.0.0", "1.9.9");
    let tests = MockTestRunner::passing();

    let run = run_scenario(Some("ghp_token"), "main", "abc123", &builder, &release, &tests).await;
    run.ok();

    let phases: Vec<Phase> = run
        .events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::PhaseStarted { phase } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            Phase::Test,
            Phase::Classify,
            Phase::Build,
            Phase::Release,
            Phase::Tag,
            Phase::Publish
        ]
    );

    let transitions: Vec<(Environment, Environment)> = run
        .events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::EnvironmentChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (Environment::None, Environment::Ci),
            (Environment::Ci, Environment::LatestStable),
            (Environment::LatestStable, Environment::Stable),
        ]
    );

    assert!(matches!(
        run.events.last(),
        Some(PipelineEvent::PipelineCompleted { environment: Environment::Stable, .. })
    ));
}

/// A local run on main still asks the release engine, and the origin is kept
#[tokio::test]
async fn test_local_run_on_main_keeps_origin() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::without_next("0.3.1");
    let tests = MockTestRunner::passing();

    let run = run_scenario(None, "main", "f00d", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Latest);
    assert_eq!(result.origin, Some(Origin::Local));
    assert_eq!(release.call_count(), 1);

    let overwritten = run.events.iter().any(|e| {
        matches!(
            e,
            PipelineEvent::EnvironmentChanged { from: Environment::Local, to: Environment::LatestStable }
        )
    });
    assert!(overwritten);
}

/// A main branch with a slash still triggers a release after tag sanitizing
#[tokio::test]
async fn test_slashed_main_branch_is_released() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::with_next("1.0.0", "0.9.0");
    let tests = MockTestRunner::passing();
    let mut settings = settings(Some("ghp_token"));
    settings.main_branch = "release/v1".to_string();

    let run = run_scenario_with(settings, "release/v1", "abc123", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Stable);
    assert_eq!(release.call_count(), 1);
    assert_tags(&run, &["1.0.0", "stable", "latest"]);
}

/// A sibling branch of a slashed main branch is still a review build
#[tokio::test]
async fn test_slashed_main_branch_does_not_match_siblings() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::with_next("1.0.0", "0.9.0");
    let tests = MockTestRunner::passing();
    let mut settings = settings(Some("ghp_token"));
    settings.main_branch = "release/v1".to_string();

    let run = run_scenario_with(settings, "release/v2", "abc123", &builder, &release, &tests).await;

    assert_eq!(run.ok().environment, Environment::Review);
    assert_eq!(release.call_count(), 0);
    let tag = format!("review-release-v2-abc123.{}", fixed_timestamp());
    assert_tags(&run, &[tag.as_str()]);
}

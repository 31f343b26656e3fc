//! Test: non-main branches publish a single review tag

use crate::helpers::*;
use release_pipeline::Environment;

/// Review builds never consult the release engine
#[tokio::test]
async fn test_review_build() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::with_next("9.9.9", "9.9.8");
    let tests = MockTestRunner::passing();

    let run = run_scenario(Some("ghp_token"), "feature-x", "def456", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Review);
    assert!(result.version.is_none());
    let tag = format!("review-feature-x-def456.{}", fixed_timestamp());
    assert_tags(&run, &[tag.as_str()]);
    assert_eq!(builder.published_tags(), vec![tag]);
    assert_eq!(release.call_count(), 0);
}

/// Branch classification overrides the local classification
#[tokio::test]
async fn test_local_review_build_still_publishes() {
    let builder = MockBuilder::new();
    let release = MockReleaseEngine::without_next("1.0.0");
    let tests = MockTestRunner::passing();

    let run = run_scenario(None, "bugfix-7", "0a1b2c", &builder, &release, &tests).await;

    let result = run.ok();
    assert_eq!(result.environment, Environment::Review);
    assert_eq!(result.published.len(), 1);
    assert_eq!(release.call_count(), 0);
}

/// Identical inputs and clock give identical tags
#[tokio::test]
async fn test_review_tags_are_reproducible() {
    let release = MockReleaseEngine::without_next("1.0.0");
    let tests = MockTestRunner::passing();

    let first = run_scenario(None, "feature-y", "123abc", &MockBuilder::new(), &release, &tests).await;
    let second = run_scenario(None, "feature-y", "123abc", &MockBuilder::new(), &release, &tests).await;

    assert_eq!(first.ok().tags, second.ok().tags);
}

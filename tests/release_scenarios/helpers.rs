//! Test utilities: mock collaborators and a fixed clock

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use release_pipeline::core::{sanitize_tag_component, PipelineError, PipelineResult, ReleaseDecision, RunInputs, ServiceError};
use release_pipeline::execution::{EngineSettings, PipelineEngine, PipelineEvent};
use release_pipeline::services::{
    ContainerBuildService, Credentials, ImageHandle, ReleaseEngine, TestRunner,
};
use release_pipeline::PipelineContext;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const REGISTRY: &str = "ghcr.io/acme/widget";

/// Instant used by every scenario
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
}

pub fn fixed_timestamp() -> i64 {
    fixed_now().timestamp()
}

/// Builder that records what it was asked to do
#[derive(Clone, Default)]
pub struct MockBuilder {
    pub builds: Arc<AtomicUsize>,
    pub attempted: Arc<Mutex<Vec<String>>>,
    pub published: Arc<Mutex<Vec<String>>>,
    fail_build: bool,
    fail_on_tag: Option<String>,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_build() -> Self {
        Self {
            fail_build: true,
            ..Self::default()
        }
    }

    pub fn failing_on_tag(tag: &str) -> Self {
        Self {
            fail_on_tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn attempted_tags(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn published_tags(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerBuildService for MockBuilder {
    async fn build(&self, _source_dir: &Path) -> Result<ImageHandle, ServiceError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_build {
            return Err(ServiceError::Other("Dockerfile not found".to_string()));
        }
        Ok(ImageHandle {
            reference: "release-pipeline/test:build".to_string(),
        })
    }

    async fn publish(
        &self,
        _image: &ImageHandle,
        registry_path: &str,
        tag: &str,
        _credentials: &Credentials,
    ) -> Result<String, ServiceError> {
        self.attempted.lock().unwrap().push(tag.to_string());
        if self.fail_on_tag.as_deref() == Some(tag) {
            return Err(ServiceError::Other("denied: requested access to the resource is denied".to_string()));
        }
        self.published.lock().unwrap().push(tag.to_string());
        Ok(format!("{}:{}", registry_path, tag))
    }
}

/// Release engine returning a scripted decision
#[derive(Clone)]
pub struct MockReleaseEngine {
    pub calls: Arc<AtomicUsize>,
    decision: Result<ReleaseDecision, String>,
}

impl MockReleaseEngine {
    pub fn with_next(next: &str, last: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            decision: Ok(ReleaseDecision::new(Some(next.to_string()), last)),
        }
    }

    pub fn without_next(last: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            decision: Ok(ReleaseDecision::new(None, last)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            decision: Err(message.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseEngine for MockReleaseEngine {
    async fn compute_next_release(
        &self,
        _source_dir: &Path,
        _credentials: &Credentials,
        _repository_url: Option<&str>,
    ) -> Result<ReleaseDecision, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.decision.clone().map_err(ServiceError::Other)
    }
}

/// Test runner that passes or fails on demand
#[derive(Clone, Default)]
pub struct MockTestRunner {
    pub runs: Arc<AtomicUsize>,
    fail: bool,
}

impl MockTestRunner {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for MockTestRunner {
    async fn run(&self, _source_dir: &Path) -> Result<(), ServiceError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::Exit {
                command: "sh -c cargo test".to_string(),
                code: 101,
                stderr: "test result: FAILED. 1 passed; 2 failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything a scenario inspects after a run
pub struct ScenarioRun {
    pub result: Result<PipelineResult, PipelineError>,
    pub events: Vec<PipelineEvent>,
}

impl ScenarioRun {
    pub fn ok(&self) -> &PipelineResult {
        match &self.result {
            Ok(result) => result,
            Err(e) => panic!("pipeline failed: {}", e),
        }
    }

    pub fn err(&self) -> &PipelineError {
        match &self.result {
            Ok(result) => panic!("pipeline unexpectedly succeeded: {:?}", result),
            Err(e) => e,
        }
    }
}

pub fn settings(token: Option<&str>) -> EngineSettings {
    EngineSettings {
        source_dir: PathBuf::from("."),
        registry_path: REGISTRY.to_string(),
        repository_url: Some("https://github.com/acme/widget".to_string()),
        main_branch: "main".to_string(),
        credentials: Credentials::new(Some("acme-bot".to_string()), token.map(str::to_string)),
    }
}

/// Run a pipeline with mock collaborators and the fixed clock
pub async fn run_scenario(
    token: Option<&str>,
    branch: &str,
    commit_hash: &str,
    builder: &MockBuilder,
    release: &MockReleaseEngine,
    tests: &MockTestRunner,
) -> ScenarioRun {
    run_scenario_with(settings(token), branch, commit_hash, builder, release, tests).await
}

/// Same as [`run_scenario`] with explicit engine settings
pub async fn run_scenario_with(
    settings: EngineSettings,
    branch: &str,
    commit_hash: &str,
    builder: &MockBuilder,
    release: &MockReleaseEngine,
    tests: &MockTestRunner,
) -> ScenarioRun {
    let context = PipelineContext::new(RunInputs {
        credentials_present: settings.credentials.is_present(),
        branch: sanitize_tag_component(branch),
        commit_hash: sanitize_tag_component(commit_hash),
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut engine = PipelineEngine::new(builder.clone(), release.clone(), tests.clone(), settings)
        .with_clock(fixed_now);
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let result = engine.run(context).await;
    let events = events.lock().unwrap().clone();
    ScenarioRun { result, events }
}

pub fn assert_tags(run: &ScenarioRun, expected: &[&str]) {
    let result = run.ok();
    assert_eq!(result.tags, expected, "unexpected tags");
}

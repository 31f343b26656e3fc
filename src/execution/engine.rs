//! Release pipeline engine - orchestrates a single run

use crate::core::{
    classify_branch_with_main, classify_ci_or_local, compute_tags, resolve_release_version,
    sanitize_tag_component, BranchKind, Environment, Origin, Phase, PipelineContext,
    PipelineError, PipelineResult, PublishedImage,
};
use crate::services::{ContainerBuildService, Credentials, ImageHandle, ReleaseEngine, TestRunner};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    PhaseStarted {
        phase: Phase,
    },
    EnvironmentChanged {
        from: Environment,
        to: Environment,
    },
    ImageBuilt {
        reference: String,
    },
    ReleaseResolved {
        environment: Environment,
        version: String,
    },
    TagsComputed {
        tags: Vec<String>,
    },
    ImagePublished {
        tag: String,
        uri: String,
    },
    PhaseFailed {
        phase: Phase,
        error: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        environment: Environment,
        tags: Vec<String>,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Source of the current instant, read once per run
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Static settings for a run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub source_dir: PathBuf,
    pub registry_path: String,
    pub repository_url: Option<String>,
    pub main_branch: String,
    pub credentials: Credentials,
}

/// Runs test, classify, build, release, tag and publish in order
pub struct PipelineEngine<B, R, T> {
    builder: B,
    release_engine: R,
    test_runner: T,
    settings: EngineSettings,
    clock: Clock,
    event_handlers: Vec<EventHandler>,
}

impl<B, R, T> PipelineEngine<B, R, T>
where
    B: ContainerBuildService,
    R: ReleaseEngine,
    T: TestRunner,
{
    pub fn new(builder: B, release_engine: R, test_runner: T, settings: EngineSettings) -> Self {
        Self {
            builder,
            release_engine,
            test_runner,
            settings,
            clock: Arc::new(Utc::now),
            event_handlers: Vec::new(),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: PipelineEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    fn transition(&self, context: &mut PipelineContext, to: Environment) {
        let from = context.environment;
        context.environment = to;
        info!("Environment: {} -> {}", from, to);
        self.emit(PipelineEvent::EnvironmentChanged { from, to });
    }

    /// Execute the entire pipeline
    ///
    /// The first failing phase aborts the run. Publishing is not
    /// transactional: tags pushed before a failed tag stay published.
    pub async fn run(&self, mut context: PipelineContext) -> Result<PipelineResult, PipelineError> {
        info!("Starting pipeline run {}", context.run_id);

        match self.run_phases(&mut context).await {
            Ok(published) => {
                info!(
                    "Pipeline completed: environment={} tags={:?}",
                    context.environment, context.tags
                );
                self.emit(PipelineEvent::PipelineCompleted {
                    run_id: context.run_id,
                    environment: context.environment,
                    tags: context.tags.clone(),
                });
                Ok(PipelineResult::from_context(context, published))
            }
            Err(e) => {
                error!("{} phase failed: {}", e.phase(), e);
                self.emit(PipelineEvent::PhaseFailed {
                    phase: e.phase(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_phases(&self, context: &mut PipelineContext) -> Result<Vec<PublishedImage>, PipelineError> {
        self.run_tests().await?;
        self.classify_origin(context);
        let image = self.build_image().await?;
        self.classify_branch(context);
        self.resolve_release(context).await?;
        self.compute_tags(context)?;
        self.publish(&image, &context.tags).await
    }

    async fn run_tests(&self) -> Result<(), PipelineError> {
        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Test });
        self.test_runner
            .run(&self.settings.source_dir)
            .await
            .map_err(PipelineError::TestFailure)
    }

    fn classify_origin(&self, context: &mut PipelineContext) {
        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Classify });
        context.origin = Some(Origin::detect(context.credentials_present));
        let env = classify_ci_or_local(context.credentials_present);
        if context.credentials_present {
            info!("Running in CI environment");
        } else {
            info!("Running locally");
        }
        self.transition(context, env);
    }

    async fn build_image(&self) -> Result<ImageHandle, PipelineError> {
        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Build });
        let image = self
            .builder
            .build(&self.settings.source_dir)
            .await
            .map_err(PipelineError::Build)?;
        info!("Image built: {}", image.reference);
        self.emit(PipelineEvent::ImageBuilt {
            reference: image.reference.clone(),
        });
        Ok(image)
    }

    /// Overwrites the CI/local classification; the origin stays on the context
    ///
    /// The context branch is already tag-safe, so the main branch is compared
    /// in the same form (`release/v1` matches `release-v1`).
    fn classify_branch(&self, context: &mut PipelineContext) {
        let main_branch = sanitize_tag_component(&self.settings.main_branch);
        context.branch_kind = Some(BranchKind::detect(&context.branch, &main_branch));
        let env = classify_branch_with_main(&context.branch, &main_branch);
        self.transition(context, env);
    }

    async fn resolve_release(&self, context: &mut PipelineContext) -> Result<(), PipelineError> {
        if context.environment != Environment::LatestStable {
            info!("Not running the release engine for {}", context.environment);
            return Ok(());
        }

        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Release });
        let decision = self
            .release_engine
            .compute_next_release(
                &self.settings.source_dir,
                &self.settings.credentials,
                self.settings.repository_url.as_deref(),
            )
            .await
            .map_err(PipelineError::ReleaseComputation)?;

        let resolved = resolve_release_version(context.environment, &decision)?;
        context.release_decision = Some(decision);

        if let Some((env, version)) = resolved {
            context.version = Some(version.clone());
            self.transition(context, env);
            self.emit(PipelineEvent::ReleaseResolved {
                environment: env,
                version,
            });
        }
        Ok(())
    }

    fn compute_tags(&self, context: &mut PipelineContext) -> Result<(), PipelineError> {
        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Tag });
        let now = (self.clock)();
        context.tags = compute_tags(
            context.environment,
            context.version.as_deref(),
            &context.branch,
            &context.commit_hash,
            now,
        )?;

        if context.tags.is_empty() {
            info!("No tags for environment {}", context.environment);
        } else {
            info!("Tags for {}: {:?}", context.environment, context.tags);
        }
        self.emit(PipelineEvent::TagsComputed {
            tags: context.tags.clone(),
        });
        Ok(())
    }

    async fn publish(&self, image: &ImageHandle, tags: &[String]) -> Result<Vec<PublishedImage>, PipelineError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        self.emit(PipelineEvent::PhaseStarted { phase: Phase::Publish });
        let mut published = Vec::with_capacity(tags.len());
        for tag in tags {
            let uri = self
                .builder
                .publish(image, &self.settings.registry_path, tag, &self.settings.credentials)
                .await
                .map_err(|source| PipelineError::Publish {
                    tag: tag.clone(),
                    published: published.iter().map(|p: &PublishedImage| p.tag.clone()).collect(),
                    source,
                })?;
            self.emit(PipelineEvent::ImagePublished {
                tag: tag.clone(),
                uri: uri.clone(),
            });
            published.push(PublishedImage {
                tag: tag.clone(),
                uri,
            });
        }

        info!("Published with tags: {}", tags.join(", "));
        Ok(published)
    }
}

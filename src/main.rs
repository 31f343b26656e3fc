use anyhow::{Context, Result};
use chrono::Utc;
use release_pipeline::cli::commands::{
    EditorArg, NextReleaseCommand, PlanCommand, RunCommand, UpdateChartCommand,
};
use release_pipeline::cli::output::*;
use release_pipeline::cli::{Cli, Command};
use release_pipeline::core::config::PipelineConfig;
use release_pipeline::core::{
    classify_branch_with_main, classify_ci_or_local, compute_tags, resolve_release_version,
    sanitize_tag_component, PipelineContext, ReleaseDecision, RunInputs,
};
use release_pipeline::execution::{ChartUpdateRequest, ChartUpdater, ChartValues, EngineSettings, PipelineEngine};
use release_pipeline::services::{
    test_runner, ConfigFileEditor, Credentials, DockerCli, GitCli, ReleaseEngine, SemanticRelease,
    SerdeYamlEditor, YqEditor,
};
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = load_config(cli.config.as_deref())?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, config).await?,
        Command::UpdateChart(cmd) => update_chart(cmd).await?,
        Command::NextRelease(cmd) => next_release(cmd, config).await?,
        Command::Plan(cmd) => plan(cmd, &config)?,
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load pipeline config from {}", path)),
        None => Ok(PipelineConfig::default()),
    }
}

/// Overlay command line flags on the file configuration
fn apply_overrides(mut config: PipelineConfig, cmd: &RunCommand) -> Result<PipelineConfig> {
    if let Some(source) = &cmd.source {
        config.source_dir = source.clone();
    }
    if let Some(registry) = &cmd.registry_path {
        config.registry_path = Some(registry.clone());
    }
    if let Some(username) = &cmd.username {
        config.username = Some(username.clone());
    }
    if let Some(url) = &cmd.repository_url {
        config.repository_url = Some(url.clone());
    }
    if let Some(main_branch) = &cmd.main_branch {
        config.main_branch = main_branch.clone();
    }
    if let Some(test_command) = &cmd.test_command {
        config.test_command = Some(test_command.clone());
    }
    if let Some(dockerfile) = &cmd.dockerfile {
        config.dockerfile = dockerfile.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run_pipeline(cmd: &RunCommand, config: PipelineConfig) -> Result<()> {
    let config = apply_overrides(config, cmd)?;
    let registry_path = config.require_registry_path()?.to_string();
    let git = GitCli::new();

    let branch = match &cmd.branch {
        Some(branch) => branch.clone(),
        None => git
            .current_branch(&config.source_dir)
            .await
            .context("No --branch given and the current branch could not be read")?,
    };
    let commit_hash = match &cmd.commit_hash {
        Some(hash) => hash.clone(),
        None => git
            .short_commit(&config.source_dir)
            .await
            .context("No --commit-hash given and HEAD could not be read")?,
    };

    let credentials = Credentials::new(config.username.clone(), cmd.github_token.clone());
    let context = PipelineContext::new(RunInputs {
        credentials_present: credentials.is_present(),
        branch: sanitize_tag_component(&branch),
        commit_hash: sanitize_tag_component(&commit_hash),
    });

    println!(
        "{} Release pipeline for {} @ {}",
        ROCKET,
        style(&context.branch).bold(),
        style(&context.commit_hash).dim()
    );

    let timeouts = config.timeouts;
    let builder = DockerCli::new(config.dockerfile.clone(), context.run_id)
        .with_timeouts(timeouts.build_secs, timeouts.publish_secs);
    let release_engine = SemanticRelease::new()
        .with_branch(config.main_branch.clone())
        .with_timeout(timeouts.release_secs);
    let tests = test_runner::from_command(config.test_command.as_deref(), timeouts.test_secs);

    let settings = EngineSettings {
        source_dir: config.source_dir.clone(),
        registry_path,
        repository_url: config.repository_url.clone(),
        main_branch: config.main_branch.clone(),
        credentials,
    };
    let mut engine = PipelineEngine::new(builder, release_engine, tests, settings);

    let spinner = create_spinner("Starting");
    let progress = spinner.clone();
    engine.add_event_handler(move |event| {
        progress.println(format_pipeline_event(&event));
    });

    let result = engine.run(context).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("\n{}", format_result(&result));
            }
            Ok(())
        }
        Err(e) => {
            println!("\n{}", format_failure(&e));
            error!("{:#}", anyhow::Error::new(e));
            std::process::exit(1);
        }
    }
}

async fn update_chart(cmd: &UpdateChartCommand) -> Result<()> {
    let values = ChartValues::parse(&cmd.values_json).context("Invalid --values-json")?;
    let request = ChartUpdateRequest::new(values, cmd.helm_repo_url.clone(), cmd.branch.clone())
        .with_token(cmd.github_token.clone())
        .with_values_file(cmd.values_file.clone())
        .with_chart_path(cmd.chart_path.clone());

    println!(
        "{} Updating chart in {} ({})",
        INFO,
        style(&cmd.helm_repo_url).bold(),
        style(&cmd.branch).cyan()
    );

    let outcome = match cmd.editor {
        EditorArg::Yq => run_chart_update(YqEditor::new(), &request).await,
        EditorArg::Builtin => run_chart_update(SerdeYamlEditor, &request).await,
    };

    match outcome {
        Ok(outcome) => {
            println!("{}", format_chart_outcome(&outcome));
            Ok(())
        }
        Err(e) => {
            println!("{} Failed to update chart files: {}", CROSS, style(&e).red());
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run_chart_update<E: ConfigFileEditor>(
    editor: E,
    request: &ChartUpdateRequest,
) -> Result<release_pipeline::execution::ChartUpdateOutcome> {
    let spinner = create_spinner("Updating chart");
    let result = ChartUpdater::new(GitCli::new(), editor).update(request).await;
    spinner.finish_and_clear();
    result.context("Failed to update chart files")
}

async fn next_release(cmd: &NextReleaseCommand, config: PipelineConfig) -> Result<()> {
    let source_dir = cmd.source.clone().unwrap_or(config.source_dir);
    let username = cmd.username.clone().or(config.username);
    let repository_url = cmd.repository_url.clone().or(config.repository_url);
    let credentials = Credentials::new(username, cmd.github_token.clone());

    let engine = SemanticRelease::new()
        .with_branch(config.main_branch)
        .with_timeout(config.timeouts.release_secs);
    let decision = engine
        .compute_next_release(&source_dir, &credentials, repository_url.as_deref())
        .await
        .context("Release computation failed")?;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn plan(cmd: &PlanCommand, config: &PipelineConfig) -> Result<()> {
    let branch = sanitize_tag_component(&cmd.branch);
    let commit_hash = sanitize_tag_component(&cmd.commit_hash);
    let main_branch = sanitize_tag_component(cmd.main_branch.as_deref().unwrap_or(&config.main_branch));

    let origin_env = classify_ci_or_local(cmd.ci);
    let mut env = classify_branch_with_main(&branch, &main_branch);
    let mut version = None;

    let decision = ReleaseDecision::new(cmd.next_release.clone(), cmd.last_release.clone());
    if let Some((resolved, v)) = resolve_release_version(env, &decision)? {
        env = resolved;
        version = Some(v);
    }
    let tags = compute_tags(env, version.as_deref(), &branch, &commit_hash, Utc::now())?;

    if cmd.json {
        let data = serde_json::json!({
            "origin": origin_env,
            "environment": env,
            "version": version,
            "tags": tags,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Origin: {}", INFO, format_environment(origin_env));
        println!("{} Environment: {}", INFO, format_environment(env));
        if let Some(v) = &version {
            println!("  Version: {}", style(v).bold());
        }
        if tags.is_empty() {
            println!("{} No tags, nothing would be published", WARN);
        } else {
            println!("  Tags: {}", style(tags.join(", ")).cyan());
        }
    }
    Ok(())
}

//! CLI output formatting

use crate::core::{Environment, Phase, PipelineError, PipelineResult};
use crate::execution::{ChartUpdateOutcome, PipelineEvent};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for long-running external phases
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an environment for display
pub fn format_environment(env: Environment) -> String {
    match env {
        Environment::Stable => style("STABLE").green().bold().to_string(),
        Environment::Latest => style("LATEST").green().to_string(),
        Environment::Review => style("REVIEW").cyan().to_string(),
        Environment::Local => style("LOCAL").dim().to_string(),
        Environment::LatestStable => style("LATEST_STABLE").yellow().to_string(),
        Environment::Ci => style("CI").dim().to_string(),
        Environment::None => style("NONE").dim().to_string(),
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Test => "Running tests",
        Phase::Classify => "Classifying environment",
        Phase::Build => "Building image",
        Phase::Release => "Computing next release",
        Phase::Tag => "Computing tags",
        Phase::Publish => "Publishing image",
    }
}

/// Format a pipeline event for display
pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::PhaseStarted { phase } => {
            format!("{} {}", SPINNER, style(phase_label(*phase)).cyan())
        }
        PipelineEvent::EnvironmentChanged { from, to } => format!(
            "{} Environment {} → {}",
            INFO,
            format_environment(*from),
            format_environment(*to)
        ),
        PipelineEvent::ImageBuilt { reference } => {
            format!("{} Built {}", CHECK, style(reference).dim())
        }
        PipelineEvent::ReleaseResolved { environment, version } => format!(
            "{} Release {} ({})",
            INFO,
            style(version).bold(),
            format_environment(*environment)
        ),
        PipelineEvent::TagsComputed { tags } => {
            if tags.is_empty() {
                format!("{} No tags for this environment", WARN)
            } else {
                format!("{} Tags: {}", INFO, style(tags.join(", ")).cyan())
            }
        }
        PipelineEvent::ImagePublished { uri, .. } => {
            format!("{} Published {}", CHECK, style(uri).green())
        }
        PipelineEvent::PhaseFailed { phase, error } => {
            format!("{} {} failed: {}", CROSS, style(phase).red(), style(error).dim())
        }
        PipelineEvent::PipelineCompleted { run_id, environment, .. } => format!(
            "{} Run ({}) finished as {}",
            ROCKET,
            style(&run_id.to_string()[..8]).dim(),
            format_environment(*environment)
        ),
    }
}

/// Format the final report of a successful run
pub fn format_result(result: &PipelineResult) -> String {
    let mut lines = vec![format!(
        "{} Environment: {}",
        CHECK,
        format_environment(result.environment)
    )];
    if let Some(version) = &result.version {
        lines.push(format!("  Version: {}", style(version).bold()));
    }
    if result.is_noop() {
        lines.push(format!("  {}", style("Nothing published").dim()));
    } else {
        for image in &result.published {
            lines.push(format!("  {}", style(&image.uri).green()));
        }
    }
    lines.join("\n")
}

/// Format a failed run, naming the phase
pub fn format_failure(error: &PipelineError) -> String {
    let mut out = format!(
        "{} {} phase failed: {}",
        CROSS,
        style(error.phase()).bold(),
        style(error).red()
    );
    if let PipelineError::Publish { published, .. } = error {
        if !published.is_empty() {
            out.push_str(&format!(
                "\n  {} Already published: {}",
                WARN,
                published.join(", ")
            ));
        }
    }
    out
}

/// Format the result of a chart update
pub fn format_chart_outcome(outcome: &ChartUpdateOutcome) -> String {
    format!(
        "{} Chart {} → {} (app {})\n  {}",
        CHECK,
        style(&outcome.previous_version).dim(),
        style(&outcome.new_version).green(),
        style(&outcome.app_version).bold(),
        style(&outcome.commit_message).dim()
    )
}

//! Publish tag computation

use crate::core::{environment::Environment, error::PipelineError};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Compute the ordered publish tags for a classified run
///
/// The first tag is the primary one, later tags are aliases. `now` is read
/// once by the caller and shared by every tag of the run. Environments that
/// do not publish yield an empty list.
pub fn compute_tags(
    env: Environment,
    version: Option<&str>,
    branch: &str,
    commit_hash: &str,
    now: DateTime<Utc>,
) -> Result<Vec<String>, PipelineError> {
    let timestamp = now.timestamp();

    let tags = match env {
        Environment::Stable => {
            let version = version.ok_or(PipelineError::MissingVersion(env))?;
            vec![
                version.to_string(),
                Environment::Stable.to_string(),
                Environment::Latest.to_string(),
            ]
        }
        Environment::Latest => {
            let version = version.ok_or(PipelineError::MissingVersion(env))?;
            vec![
                format!("{}-{}.{}", version, commit_hash, timestamp),
                Environment::Latest.to_string(),
            ]
        }
        Environment::Review => {
            vec![format!("review-{}-{}.{}", branch, commit_hash, timestamp)]
        }
        _ => Vec::new(),
    };

    Ok(tags)
}

fn invalid_tag_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"))
}

/// Make a branch name or commit hash safe to embed in an image tag
///
/// Anything outside `[A-Za-z0-9_.-]`, including `/` and whitespace, becomes `-`.
pub fn sanitize_tag_component(raw: &str) -> String {
    invalid_tag_chars().replace_all(raw.trim(), "-").into_owned()
}

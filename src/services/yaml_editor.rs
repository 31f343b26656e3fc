//! Config File Editor implementations for YAML files

use crate::core::ServiceError;
use crate::services::{ConfigFileEditor, ToolCommand};
use async_trait::async_trait;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

fn plain_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Convert a dotted key path into a yq path expression
///
/// `image.tag` becomes `.image.tag`; segments that are not plain identifiers
/// are quoted, so `annotations.app-name` becomes `.annotations."app-name"`.
pub fn yq_path(key: &str) -> String {
    key.split('.')
        .map(|segment| {
            if plain_segment().is_match(segment) {
                format!(".{}", segment)
            } else {
                format!(".{}", quote(segment))
            }
        })
        .collect()
}

/// yq assignment expression setting `key` to the string `value`
pub fn yq_assignment(key: &str, value: &str) -> String {
    format!("{} = {}", yq_path(key), quote(value))
}

/// Edits files in place with mikefarah `yq`, preserving comments and layout
#[derive(Debug, Clone)]
pub struct YqEditor {
    yq_path: String,
    timeout_secs: u64,
}

impl YqEditor {
    pub fn new() -> Self {
        Self {
            yq_path: "yq".to_string(),
            timeout_secs: 60,
        }
    }

    pub fn with_yq_path(mut self, path: impl Into<String>) -> Self {
        self.yq_path = path.into();
        self
    }
}

impl Default for YqEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigFileEditor for YqEditor {
    async fn read_value(&self, file: &Path, key: &str) -> Result<String, ServiceError> {
        let out = ToolCommand::new(&self.yq_path)
            .args(["eval".to_string(), yq_path(key)])
            .arg(file.to_string_lossy())
            .timeout(self.timeout_secs)
            .output()
            .await?;
        Ok(out.trim().to_string())
    }

    async fn apply(&self, file: &Path, values: &[(String, String)]) -> Result<(), ServiceError> {
        for (key, value) in values {
            debug!("Setting {} in {}", key, file.display());
            ToolCommand::new(&self.yq_path)
                .args(["-i".to_string(), yq_assignment(key, value)])
                .arg(file.to_string_lossy())
                .timeout(self.timeout_secs)
                .output()
                .await?;
        }
        Ok(())
    }
}

/// In-process editor built on serde_yaml
///
/// Does not need `yq` installed, but rewrites the whole document, so
/// comments and key ordering quirks are not preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeYamlEditor;

impl SerdeYamlEditor {
    fn load(file: &Path) -> Result<Value, ServiceError> {
        let content = std::fs::read_to_string(file)?;
        if content.trim().is_empty() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        serde_yaml::from_str(&content)
            .map_err(|e| ServiceError::Other(format!("Failed to parse {}: {}", file.display(), e)))
    }

    /// Render a scalar the way `yq eval` prints it
    fn render(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => "null".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default(),
        }
    }

    /// Set `key` inside `root`, creating intermediate mappings as needed
    pub fn set_path(root: &mut Value, key: &str, value: &str) {
        let mut current = root;
        for segment in key.split('.') {
            if !current.is_mapping() {
                *current = Value::Mapping(Mapping::new());
            }
            current = match current {
                Value::Mapping(map) => map
                    .entry(Value::String(segment.to_string()))
                    .or_insert(Value::Null),
                _ => return,
            };
        }
        *current = Value::String(value.to_string());
    }

    pub fn get_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        key.split('.').try_fold(root, |current, segment| current.get(segment))
    }
}

#[async_trait]
impl ConfigFileEditor for SerdeYamlEditor {
    async fn read_value(&self, file: &Path, key: &str) -> Result<String, ServiceError> {
        let doc = Self::load(file)?;
        Ok(Self::render(Self::get_path(&doc, key)))
    }

    async fn apply(&self, file: &Path, values: &[(String, String)]) -> Result<(), ServiceError> {
        let mut doc = Self::load(file)?;
        for (key, value) in values {
            debug!("Setting {} in {}", key, file.display());
            Self::set_path(&mut doc, key, value);
        }
        let rendered = serde_yaml::to_string(&doc)
            .map_err(|e| ServiceError::Other(format!("Failed to render {}: {}", file.display(), e)))?;
        std::fs::write(file, rendered)?;
        Ok(())
    }
}

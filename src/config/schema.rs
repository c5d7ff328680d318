//! Configuration schema types for `taskconf.toml`
//!
//! Defines the structure and validation rules for a task-config project.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::build::Pattern;

/// Runtime data handed to every pattern of a build.
pub type RuntimeData = serde_json::Map<String, serde_json::Value>;

/// Which export shapes a module may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportPolicy {
    /// Factories are invoked, descriptors are merged with runtime data
    #[default]
    Auto,
    /// Every module must export a factory
    Factory,
}

impl std::fmt::Display for ExportPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportPolicy::Auto => write!(f, "auto"),
            ExportPolicy::Factory => write!(f, "factory"),
        }
    }
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
    /// Build context root; pattern sources resolve against it
    #[serde(default = "default_context")]
    pub context: PathBuf,
    /// Build output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_context() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

/// Module loading section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Allowed export shapes
    #[serde(default)]
    pub exports: ExportPolicy,
    /// Extensions probed, in order, when a request names no existing file
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Extension to interpreter command; matching files become command factories
    #[serde(default)]
    pub interpreters: BTreeMap<String, Vec<String>>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            exports: ExportPolicy::default(),
            extensions: default_extensions(),
            interpreters: BTreeMap::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string(), "json5".to_string(), "toml".to_string()]
}

/// Task-set shorthand expanding into patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Explicit task names
    #[serde(default)]
    pub names: Vec<String>,
    /// Glob (relative to the context root) whose matches name tasks by parent directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discover: Option<String>,
    /// Source template, `{name}` is replaced by the task name
    #[serde(default = "default_task_from")]
    pub from: String,
    /// Asset template, `{name}` is replaced by the task name
    #[serde(default = "default_task_to")]
    pub to: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            names: vec![],
            discover: None,
            from: default_task_from(),
            to: default_task_to(),
        }
    }
}

fn default_task_from() -> String {
    "./{name}/task.json5".to_string()
}

fn default_task_to() -> String {
    "{name}/task.conf".to_string()
}

/// Raw file copy rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPattern {
    /// Glob relative to the context root
    pub from: String,
    /// Asset name template (`[name]`, `[ext]`, `[path]`)
    pub to: String,
}

/// Build behaviour section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Stop at the first failing pattern
    #[serde(default)]
    pub fail_fast: bool,
    /// Write assets to disk even when the compilation recorded errors
    #[serde(default)]
    pub emit_on_errors: bool,
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between builds
    #[serde(default)]
    pub clear_screen: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

fn default_debounce_ms() -> u32 {
    100
}

/// Root configuration for `taskconf.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfConfig {
    /// Project metadata
    pub project: ProjectConfig,
    /// Module resolution and export rules
    #[serde(default)]
    pub modules: ModulesConfig,
    /// Inline runtime data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RuntimeData>,
    /// File holding runtime data (relative to the project root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    /// Explicit patterns, processed first and in order
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    /// Task-set shorthand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<TasksConfig>,
    /// Raw file copies
    #[serde(default)]
    pub copy: Vec<CopyPattern>,
    /// Build behaviour
    #[serde(default)]
    pub build: BuildConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// A single config validation problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Dotted path of the offending field
    pub field: String,
    /// What is wrong
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ConfigValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl TaskConfConfig {
    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.trim().is_empty() {
            errors.push(ConfigValidationError::new("project.name", "must not be empty"));
        }

        if self.data.is_some() && self.data_file.is_some() {
            errors.push(ConfigValidationError::new(
                "data_file",
                "cannot be combined with an inline [data] table",
            ));
        }

        for (i, pattern) in self.patterns.iter().enumerate() {
            if pattern.from.trim().is_empty() {
                errors.push(ConfigValidationError::new(
                    format!("patterns[{}].from", i),
                    "must not be empty",
                ));
            }
            if let Some(problem) = asset_name_problem(&pattern.to) {
                errors.push(ConfigValidationError::new(format!("patterns[{}].to", i), problem));
            }
        }

        if let Some(tasks) = &self.tasks {
            if !tasks.from.contains("{name}") {
                errors.push(ConfigValidationError::new("tasks.from", "must contain {name}"));
            }
            if !tasks.to.contains("{name}") {
                errors.push(ConfigValidationError::new("tasks.to", "must contain {name}"));
            }
            if tasks.names.is_empty() && tasks.discover.is_none() {
                errors.push(ConfigValidationError::new(
                    "tasks",
                    "needs `names` or `discover`",
                ));
            }
        }

        for (i, copy) in self.copy.iter().enumerate() {
            if copy.from.trim().is_empty() {
                errors.push(ConfigValidationError::new(
                    format!("copy[{}].from", i),
                    "must not be empty",
                ));
            }
            if let Some(problem) = asset_name_problem(&copy.to) {
                errors.push(ConfigValidationError::new(format!("copy[{}].to", i), problem));
            }
        }

        for ext in &self.modules.extensions {
            if ext.is_empty() || ext.starts_with('.') {
                errors.push(ConfigValidationError::new(
                    "modules.extensions",
                    format!("'{}' must be a bare extension like \"json5\"", ext),
                ));
            }
        }

        for (ext, command) in &self.modules.interpreters {
            if command.is_empty() {
                errors.push(ConfigValidationError::new(
                    format!("modules.interpreters.{}", ext),
                    "interpreter command must not be empty",
                ));
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError::new("watch.debounce_ms", "must be positive"));
        }

        errors
    }

    /// Check if the configuration is valid.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Asset names live inside the output directory.
pub(crate) fn asset_name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        return Some("must not be empty");
    }
    let path = Path::new(name);
    if path.is_absolute() {
        return Some("must be relative to the output directory");
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Some("must not leave the output directory");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> TaskConfConfig {
        toml::from_str(
            r#"
[project]
name = "jobs"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = minimal();
        assert_eq!(config.project.context, PathBuf::from("src"));
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.modules.exports, ExportPolicy::Auto);
        assert_eq!(config.modules.extensions, vec!["json", "json5", "toml"]);
        assert!(config.patterns.is_empty());
        assert!(config.data.is_none());
        assert!(!config.build.fail_fast);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parses() {
        let config: TaskConfConfig = toml::from_str(
            r#"
[project]
name = "jobs"
context = "tasks"
out = "build"

[modules]
exports = "factory"
interpreters = { js = ["node"] }

[data]
env = "dev"
retries = 3

[[patterns]]
from = "./lua/task.json5"
to = "lua/task.conf"

[[patterns]]
from = "./restapi/task.json5"
to = "restapi/task.conf"

[tasks]
names = ["echo"]

[[copy]]
from = "lua/*.csv"
to = "lua/[name].csv"
"#,
        )
        .unwrap();

        assert_eq!(config.modules.exports, ExportPolicy::Factory);
        assert_eq!(config.modules.interpreters["js"], vec!["node"]);
        assert_eq!(config.patterns.len(), 2);
        assert_eq!(config.patterns[1].to, "restapi/task.conf");
        let data = config.data.as_ref().unwrap();
        assert_eq!(data["env"], "dev");
        assert_eq!(data["retries"], 3);
        assert_eq!(config.tasks.as_ref().unwrap().from, "./{name}/task.json5");
        assert_eq!(config.copy[0].to, "lua/[name].csv");
        assert!(config.is_valid(), "{:?}", config.validate());
    }

    #[test]
    fn test_validate_rejects_escaping_asset_names() {
        let mut config = minimal();
        config.patterns.push(Pattern::new("./a.json", "../a.conf"));
        config.patterns.push(Pattern::new("./b.json", "/etc/b.conf"));
        config.patterns.push(Pattern::new("", "c.conf"));

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "patterns[0].to");
        assert_eq!(errors[1].field, "patterns[1].to");
        assert_eq!(errors[2].field, "patterns[2].from");
    }

    #[test]
    fn test_validate_data_and_data_file_conflict() {
        let mut config = minimal();
        config.data = Some(RuntimeData::new());
        config.data_file = Some(PathBuf::from("data.json"));

        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "data_file");
    }

    #[test]
    fn test_validate_tasks_templates() {
        let mut config = minimal();
        config.tasks = Some(TasksConfig {
            names: vec![],
            discover: None,
            from: "./task.json5".to_string(),
            to: "{name}.conf".to_string(),
        });

        let fields: Vec<_> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["tasks.from", "tasks"]);
    }

    #[test]
    fn test_validate_interpreters_and_extensions() {
        let mut config = minimal();
        config.modules.extensions.push(".js".to_string());
        config.modules.interpreters.insert("js".to_string(), vec![]);

        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("bare extension"));
        assert_eq!(errors[1].field, "modules.interpreters.js");
    }

    #[test]
    fn test_export_policy_display() {
        assert_eq!(ExportPolicy::Auto.to_string(), "auto");
        assert_eq!(ExportPolicy::Factory.to_string(), "factory");
    }
}

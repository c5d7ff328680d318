//! Configuration loading and discovery for `taskconf.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{
    BuildConfig, ExportPolicy, ModulesConfig, ProjectConfig, RuntimeData, TaskConfConfig,
    WatchConfig,
};
use crate::module::loader::parse_document;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "taskconf.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse taskconf.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// Runtime data could not be read or is not an object
    #[error("Invalid runtime data from {origin}: {message}")]
    Data {
        /// Where the data came from (file path or "--data")
        origin: String,
        /// What went wrong
        message: String,
    },
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override build context root
    pub context: Option<PathBuf>,
    /// Replace runtime data
    pub data: Option<RuntimeData>,
    /// Override export policy
    pub exports: Option<ExportPolicy>,
    /// Stop at the first failing pattern
    pub fail_fast: Option<bool>,
    /// Emit assets even when patterns failed
    pub emit_on_errors: Option<bool>,
}

/// Find taskconf.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find taskconf.toml by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start directory,
/// useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a taskconf.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("jobs/taskconf.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<TaskConfConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<TaskConfConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: TaskConfConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no taskconf.toml is found.
///
/// The project name is the current directory name; there are no patterns.
pub fn default_config() -> TaskConfConfig {
    let project_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unnamed".to_string());

    TaskConfConfig {
        project: ProjectConfig {
            name: project_name,
            context: PathBuf::from("src"),
            out: PathBuf::from("dist"),
        },
        modules: ModulesConfig::default(),
        data: None,
        data_file: None,
        patterns: vec![],
        tasks: None,
        copy: vec![],
        build: BuildConfig::default(),
        watch: WatchConfig::default(),
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. Data given on the
/// command line replaces both `[data]` and `data_file`.
pub fn merge_cli_overrides(config: &mut TaskConfConfig, overrides: &CliOverrides) {
    if let Some(ref out) = overrides.out {
        config.project.out = out.clone();
    }

    if let Some(ref context) = overrides.context {
        config.project.context = context.clone();
    }

    if let Some(ref data) = overrides.data {
        config.data = Some(data.clone());
        config.data_file = None;
    }

    if let Some(exports) = overrides.exports {
        config.modules.exports = exports;
    }

    if let Some(fail_fast) = overrides.fail_fast {
        config.build.fail_fast = fail_fast;
    }

    if let Some(emit_on_errors) = overrides.emit_on_errors {
        config.build.emit_on_errors = emit_on_errors;
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Resolve the runtime data for a build: inline `[data]` or the `data_file`.
pub fn load_runtime_data(
    config: &TaskConfConfig,
    project_root: &Path,
) -> Result<Option<RuntimeData>, ConfigError> {
    if let Some(data) = &config.data {
        return Ok(Some(data.clone()));
    }

    match &config.data_file {
        Some(file) => read_data_file(&resolve_path(project_root, file)).map(Some),
        None => Ok(None),
    }
}

/// Parse a `--data` argument: inline JSON5 object, or `@path` to a data file.
pub fn parse_data_arg(arg: &str, base: &Path) -> Result<RuntimeData, ConfigError> {
    match arg.strip_prefix('@') {
        Some(file) => read_data_file(&resolve_path(base, Path::new(file))),
        None => {
            let value = json5::from_str::<serde_json::Value>(arg).map_err(|e| {
                ConfigError::Data { origin: "--data".to_string(), message: e.to_string() }
            })?;
            into_object(value, "--data")
        }
    }
}

fn read_data_file(path: &Path) -> Result<RuntimeData, ConfigError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::Data { origin: origin.clone(), message: e.to_string() })?;
    let value = parse_document(path, &text)
        .map_err(|message| ConfigError::Data { origin: origin.clone(), message })?;
    into_object(value, &origin)
}

fn into_object(value: serde_json::Value, origin: &str) -> Result<RuntimeData, ConfigError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ConfigError::Data {
            origin: origin.to_string(),
            message: format!("expected an object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

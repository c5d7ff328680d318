//! Pattern discovery for the build system.
//!
//! Explicit `[[patterns]]` come first, in config order. The `[tasks]`
//! shorthand is expanded after them: listed names first, then names found by
//! the `discover` glob (the matched file's directory relative to the context
//! root), sorted and deduplicated.

use crate::build::{BuildContext, Pattern};
use crate::config::TasksConfig;
use glob::glob;
use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

/// Error during pattern discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, #[source] glob::PatternError),
    /// A task name that would produce an asset outside the output directory
    #[error("Invalid task name '{0}': {1}")]
    InvalidTaskName(String, &'static str),
}

/// Find task names: directories (relative to `context`) holding a file
/// that matches `pattern`.
pub fn discover_task_names(context: &Path, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
    let full_pattern = context.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths =
        glob(&pattern_str).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut names = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }
                match task_name(context, &path) {
                    Some(name) => names.push(name),
                    None => tracing::warn!(
                        file = %path.display(),
                        "match is not inside a task directory"
                    ),
                }
            }
            Err(e) => {
                // Log but continue on glob errors
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    names.sort();
    names.dedup();
    Ok(names)
}

/// Directory of `file` relative to `context`, `/`-separated.
fn task_name(context: &Path, file: &Path) -> Option<String> {
    let dir = file.parent()?.strip_prefix(context).ok()?;
    let parts: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Expand the task-set shorthand into patterns.
pub fn expand_tasks(context: &Path, tasks: &TasksConfig) -> Result<Vec<Pattern>, DiscoveryError> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for name in &tasks.names {
        if seen.insert(name.clone()) {
            names.push(name.clone());
        }
    }

    if let Some(pattern) = &tasks.discover {
        for name in discover_task_names(context, pattern)? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let pattern = Pattern::new(
                tasks.from.replace("{name}", &name),
                tasks.to.replace("{name}", &name),
            );
            match crate::config::schema::asset_name_problem(&pattern.to) {
                Some(problem) => Err(DiscoveryError::InvalidTaskName(name, problem)),
                None => Ok(pattern),
            }
        })
        .collect()
}

/// All patterns of a build, in processing order.
pub fn expand_patterns(ctx: &BuildContext) -> Result<Vec<Pattern>, DiscoveryError> {
    let config = ctx.config();
    let mut patterns = config.patterns.clone();

    if let Some(tasks) = &config.tasks {
        patterns.extend(expand_tasks(&ctx.context_dir(), tasks)?);
    }

    Ok(patterns)
}

/// Keep only patterns whose asset name matches one of the filter globs.
pub fn filter_patterns(
    patterns: Vec<Pattern>,
    filter: &[String],
) -> Result<Vec<Pattern>, DiscoveryError> {
    let globs = filter
        .iter()
        .map(|f| glob::Pattern::new(f).map_err(|e| DiscoveryError::InvalidPattern(f.clone(), e)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(patterns.into_iter().filter(|p| p.matches_any(&globs)).collect())
}

//! Build context containing configuration and state for a build.

use crate::config::TaskConfConfig;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context provides access to all information needed to execute a build,
/// including the configuration, project root, and output directory.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: TaskConfConfig,
    /// Project root directory (where taskconf.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Optional asset-name globs restricting which patterns run
    filter: Option<Vec<String>>,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: TaskConfConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false, filter: None }
    }

    /// Get the configuration.
    pub fn config(&self) -> &TaskConfConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the context root modules are resolved against.
    pub fn context_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.context)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Only run patterns whose asset name matches one of these globs.
    pub fn with_filter(mut self, globs: Vec<String>) -> Self {
        self.filter = Some(globs);
        self
    }

    /// Get the asset filter.
    pub fn filter(&self) -> Option<&[String]> {
        self.filter.as_deref()
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }
}

//! Build pipeline orchestration.
//!
//! One build run: expand the configured patterns, apply the plugins to a
//! fresh [`Compilation`], run the process-assets hook, then write the asset
//! table to the output directory.

use crate::build::{
    expand_patterns, filter_patterns, BuildContext, BuildResult, DiscoveryError, Pattern,
};
use crate::compilation::{AssetTable, Compilation, Hooks};
use crate::config::loader::load_runtime_data;
use crate::config::ConfigError;
use crate::module::Factory;
use crate::plugin::{CopyPlugin, Plugin, PluginError, TaskConfPlugin};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Error that stops a build before any pattern result is meaningful.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Runtime data could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Pattern expansion failed
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// A plugin aborted the compilation
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    /// An asset could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        /// Destination file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to stop on first error
    fail_fast: bool,
    /// Whether to do a dry run (don't write anything)
    dry_run: bool,
    /// Native factories registered by module path
    natives: Vec<(String, Arc<dyn Factory>)>,
    /// Extra plugins applied after the built-in ones
    plugins: Vec<Box<dyn Plugin>>,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context, fail_fast: false, dry_run: false, natives: vec![], plugins: vec![] }
    }

    /// Set fail-fast mode (stop on first error).
    ///
    /// `build.fail_fast` in the config enables it as well.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set dry-run mode (compile in memory, write nothing).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Register a native factory for a module path relative to the context root.
    pub fn with_factory(mut self, request: impl Into<String>, factory: Arc<dyn Factory>) -> Self {
        self.natives.push((request.into(), factory));
        self
    }

    /// Add a plugin to every compilation.
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// The build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the build pipeline.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let config = self.context.config();

        let data = load_runtime_data(config, self.context.project_root())?;
        let patterns = self.patterns()?;

        if self.context.is_verbose() {
            println!("Build plan: {} patterns", patterns.len());
            for pattern in &patterns {
                println!("  - {}", pattern);
            }
        }

        let compilation = self.compile(patterns, data)?;
        let has_errors = compilation.has_errors();
        let (assets, targets, _errors) = compilation.into_parts();

        let mut result = BuildResult::new();
        result.targets = targets;
        result.assets = assets.names().map(String::from).collect();

        if self.dry_run {
            tracing::debug!(assets = assets.len(), "dry run, nothing written");
        } else if has_errors && !config.build.emit_on_errors {
            tracing::warn!("compilation has errors, no assets written");
            result.emit_suppressed = true;
        } else {
            result.written = emit_assets(&assets, &self.context.out_dir())?;
        }

        result.total_duration = start.elapsed();
        tracing::info!(
            built = result.success_count(),
            skipped = result.skipped_count(),
            failed = result.failed_count(),
            duration = ?result.total_duration,
            "build finished"
        );
        Ok(result)
    }

    /// Patterns of this build after expansion and filtering.
    pub fn patterns(&self) -> Result<Vec<Pattern>, DiscoveryError> {
        let patterns = expand_patterns(&self.context)?;
        match self.context.filter() {
            Some(filter) => filter_patterns(patterns, filter),
            None => Ok(patterns),
        }
    }

    /// Apply the plugins and run the process-assets hook.
    fn compile(
        &self,
        patterns: Vec<Pattern>,
        data: Option<crate::config::RuntimeData>,
    ) -> Result<Compilation, BuildError> {
        let config = self.context.config();

        let copy = CopyPlugin::new(config.copy.clone());
        let mut task_conf = TaskConfPlugin::from_config(config, patterns, data)
            .with_fail_fast(self.fail_fast || config.build.fail_fast);
        for (request, factory) in &self.natives {
            task_conf = task_conf.with_factory(request.clone(), Arc::clone(factory));
        }

        let mut plugins: Vec<&dyn Plugin> = Vec::new();
        if !copy.patterns().is_empty() {
            plugins.push(&copy);
        }
        plugins.push(&task_conf);
        for plugin in &self.plugins {
            plugins.push(plugin.as_ref());
        }

        let mut hooks = Hooks::new();
        for plugin in plugins.iter().copied() {
            tracing::debug!(plugin = plugin.name(), "apply");
            plugin.apply(&mut hooks);
        }

        let mut compilation = Compilation::new(self.context.context_dir());
        hooks.run_process_assets(&mut compilation)?;
        Ok(compilation)
    }
}

/// Write every asset below `out_dir`, creating directories as needed.
pub fn emit_assets(assets: &AssetTable, out_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut written = Vec::with_capacity(assets.len());

    for (name, asset) in assets.iter() {
        let path = out_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| BuildError::Io { path: parent.to_path_buf(), source })?;
        }
        fs::write(&path, asset.source())
            .map_err(|source| BuildError::Io { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), bytes = asset.size(), "emitted");
        written.push(path);
    }

    Ok(written)
}

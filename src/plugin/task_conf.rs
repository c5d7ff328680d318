//! Task module to JSON task config plugin.
//!
//! For every pattern, in order: resolve the `from` module against the build
//! context, materialize its export with the runtime data, serialize it and
//! write the text to the `to` asset, replacing whatever is there. A `null`
//! result writes nothing. A failing pattern writes nothing and is recorded on
//! the compilation; the remaining patterns still run unless fail-fast is set.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use super::{Plugin, PluginError};
use crate::build::{Pattern, TargetResult};
use crate::compilation::{Asset, Compilation, Hooks, ProcessAssetsStage};
use crate::config::{ExportPolicy, RuntimeData, TaskConfConfig};
use crate::materialize::{materialize, to_json_text, MaterializeError};
use crate::module::{Factory, ModuleError, ModuleLoader, ModuleResolver};

/// Why a pattern failed.
#[derive(Debug, Error)]
pub enum PatternErrorKind {
    /// The module could not be loaded
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// The export could not be turned into JSON
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

/// A failure tied to the pattern it happened in.
#[derive(Debug, Error)]
#[error("{} -> {}: {kind}", pattern.from, pattern.to)]
pub struct PatternError {
    /// The failing pattern
    pub pattern: Pattern,
    /// What went wrong
    #[source]
    pub kind: PatternErrorKind,
}

/// Compiles task modules into JSON task config assets.
pub struct TaskConfPlugin {
    patterns: Vec<Pattern>,
    data: Option<RuntimeData>,
    policy: ExportPolicy,
    fail_fast: bool,
    extensions: Vec<String>,
    loader: ModuleLoader,
    natives: Vec<(String, Arc<dyn Factory>)>,
}

impl TaskConfPlugin {
    /// Name used for taps and as asset producer.
    pub const NAME: &'static str = "TaskConfPlugin";

    /// Create a plugin for these patterns with default module settings.
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self {
            patterns,
            data: None,
            policy: ExportPolicy::Auto,
            fail_fast: false,
            extensions: crate::module::loader::DATA_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            loader: ModuleLoader::new(),
            natives: vec![],
        }
    }

    /// Create a plugin using the module and build settings of a config.
    pub fn from_config(
        config: &TaskConfConfig,
        patterns: Vec<Pattern>,
        data: Option<RuntimeData>,
    ) -> Self {
        Self::new(patterns)
            .with_data(data)
            .with_policy(config.modules.exports)
            .with_fail_fast(config.build.fail_fast)
            .with_extensions(config.modules.extensions.clone())
            .with_loader(ModuleLoader::new().with_interpreters(config.modules.interpreters.clone()))
    }

    /// Set the runtime data shared by all patterns.
    pub fn with_data(mut self, data: Option<RuntimeData>) -> Self {
        self.data = data;
        self
    }

    /// Set the allowed export shapes.
    pub fn with_policy(mut self, policy: ExportPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop at the first failing pattern.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the probed module extensions.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the module file loader.
    pub fn with_loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Register a native factory module under a context-relative path.
    pub fn with_factory(mut self, request: impl Into<String>, factory: Arc<dyn Factory>) -> Self {
        self.natives.push((request.into(), factory));
        self
    }

    /// The configured patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The runtime data, if any.
    pub fn data(&self) -> Option<&RuntimeData> {
        self.data.as_ref()
    }

    /// A fresh resolver; its cache lives for one run.
    pub fn resolver(&self, context: &Path) -> ModuleResolver {
        let mut resolver = ModuleResolver::new(context)
            .with_extensions(self.extensions.clone())
            .with_loader(self.loader.clone());
        for (request, factory) in &self.natives {
            resolver.register_factory(request, Arc::clone(factory));
        }
        resolver
    }

    /// Process every pattern against a compilation.
    pub fn process(&self, compilation: &mut Compilation) {
        let mut resolver = self.resolver(compilation.context());

        for pattern in &self.patterns {
            let start = Instant::now();
            let outcome = self.compile_module(&mut resolver, &pattern.from);
            let duration = start.elapsed();

            match outcome {
                Ok(Some(json)) => {
                    let size = json.len();
                    let replaced = compilation
                        .assets_mut()
                        .update_asset(pattern.to.clone(), Asset::raw(json, Self::NAME));
                    tracing::info!(
                        from = %pattern.from,
                        to = %pattern.to,
                        bytes = size,
                        replaced = replaced.is_some(),
                        "task config written"
                    );
                    compilation.record(TargetResult::success(
                        pattern.to.clone(),
                        vec![PathBuf::from(&pattern.to)],
                        duration,
                    ));
                }
                Ok(None) => {
                    tracing::warn!(from = %pattern.from, to = %pattern.to, "null export, skipped");
                    compilation.record(
                        TargetResult::skipped(pattern.to.clone())
                            .with_warnings(vec![format!("{}: export is null", pattern.from)]),
                    );
                }
                Err(kind) => {
                    let error = PatternError { pattern: pattern.clone(), kind };
                    tracing::error!(from = %pattern.from, to = %pattern.to, "{}", error.kind);
                    compilation.record(TargetResult::failed(
                        pattern.to.clone(),
                        error.kind.to_string(),
                        duration,
                    ));
                    compilation.add_error(error);
                    if self.fail_fast {
                        tracing::warn!("fail-fast: remaining patterns not processed");
                        break;
                    }
                }
            }
        }
    }

    /// Compile a single module outside of a build. `None` means skip.
    pub fn render(
        &self,
        context: &Path,
        request: &str,
    ) -> Result<Option<String>, PatternErrorKind> {
        self.compile_module(&mut self.resolver(context), request)
    }

    /// Resolve, materialize and serialize one module. `None` means skip.
    fn compile_module(
        &self,
        resolver: &mut ModuleResolver,
        request: &str,
    ) -> Result<Option<String>, PatternErrorKind> {
        let exported = resolver.resolve(request)?;

        if self.policy == ExportPolicy::Factory && !exported.is_factory() {
            return Err(ModuleError::NotCallable {
                path: resolver.resolve_path(request)?,
                kind: exported.kind(),
            }
            .into());
        }

        let value = materialize(&exported, self.data.as_ref())?;
        if value.is_null() {
            return Ok(None);
        }

        Ok(Some(to_json_text(&value)?))
    }
}

impl Plugin for TaskConfPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply<'a>(&'a self, hooks: &mut Hooks<'a>) {
        hooks.tap_process_assets(Self::NAME, ProcessAssetsStage::Optimize, move |compilation| {
            self.process(compilation);
            Ok::<(), PluginError>(())
        });
    }
}

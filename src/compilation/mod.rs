//! Compilation state and the process-assets hook.
//!
//! A [`Compilation`] is the in-memory result of one build run. Plugins tap
//! the process-assets hook at a [`ProcessAssetsStage`]; taps run in stage
//! order (registration order within a stage) and read or write the
//! compilation's [`AssetTable`]. Nothing touches the disk here: the build
//! pipeline emits the finished asset table afterwards.

pub mod asset;

pub use asset::{Asset, AssetError, AssetTable};

use std::path::{Path, PathBuf};

use crate::build::TargetResult;
use crate::plugin::{PatternError, PluginError};

/// Ordered stages of asset processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessAssetsStage {
    /// Add new assets
    Additional,
    /// Basic preprocessing of existing assets
    PreProcess,
    /// Derive new assets from existing ones
    Derived,
    /// Add extra sections to existing assets
    Additions,
    /// Optimize existing assets in a general way
    Optimize,
    /// Reduce asset size
    OptimizeSize,
    /// Summarize the list of existing assets
    Summarize,
    /// Report on the final assets
    Report,
}

impl std::fmt::Display for ProcessAssetsStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessAssetsStage::Additional => "additional",
            ProcessAssetsStage::PreProcess => "pre-process",
            ProcessAssetsStage::Derived => "derived",
            ProcessAssetsStage::Additions => "additions",
            ProcessAssetsStage::Optimize => "optimize",
            ProcessAssetsStage::OptimizeSize => "optimize-size",
            ProcessAssetsStage::Summarize => "summarize",
            ProcessAssetsStage::Report => "report",
        };
        f.write_str(name)
    }
}

/// In-progress output of one build run.
#[derive(Debug)]
pub struct Compilation {
    /// Build context root
    context: PathBuf,
    /// Output assets
    assets: AssetTable,
    /// Per-pattern outcomes in processing order
    results: Vec<TargetResult>,
    /// Pattern failures
    errors: Vec<PatternError>,
}

impl Compilation {
    /// Create an empty compilation for a context root.
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self { context: context.into(), assets: AssetTable::new(), results: vec![], errors: vec![] }
    }

    /// The build context root.
    pub fn context(&self) -> &Path {
        &self.context
    }

    /// The asset table.
    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    /// Mutable access to the asset table.
    pub fn assets_mut(&mut self) -> &mut AssetTable {
        &mut self.assets
    }

    /// Record the outcome of processing one pattern.
    pub fn record(&mut self, result: TargetResult) {
        self.results.push(result);
    }

    /// Outcomes recorded so far.
    pub fn results(&self) -> &[TargetResult] {
        &self.results
    }

    /// Record a pattern failure.
    pub fn add_error(&mut self, error: PatternError) {
        self.errors.push(error);
    }

    /// Pattern failures recorded so far.
    pub fn errors(&self) -> &[PatternError] {
        &self.errors
    }

    /// Whether any pattern failed.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Split into the asset table and the recorded outcomes.
    pub fn into_parts(self) -> (AssetTable, Vec<TargetResult>, Vec<PatternError>) {
        (self.assets, self.results, self.errors)
    }
}

type ProcessAssetsFn<'a> = Box<dyn FnMut(&mut Compilation) -> Result<(), PluginError> + 'a>;

struct Tap<'a> {
    name: String,
    stage: ProcessAssetsStage,
    callback: ProcessAssetsFn<'a>,
}

/// Hooks plugins tap into.
#[derive(Default)]
pub struct Hooks<'a> {
    process_assets: Vec<Tap<'a>>,
}

impl<'a> Hooks<'a> {
    /// Create hooks with no taps.
    pub fn new() -> Self {
        Self { process_assets: vec![] }
    }

    /// Register a process-assets callback at a stage.
    pub fn tap_process_assets<F>(
        &mut self,
        name: impl Into<String>,
        stage: ProcessAssetsStage,
        callback: F,
    ) where
        F: FnMut(&mut Compilation) -> Result<(), PluginError> + 'a,
    {
        self.process_assets.push(Tap { name: name.into(), stage, callback: Box::new(callback) });
    }

    /// `(name, stage)` of every tap, in registration order.
    pub fn taps(&self) -> Vec<(&str, ProcessAssetsStage)> {
        self.process_assets.iter().map(|t| (t.name.as_str(), t.stage)).collect()
    }

    /// Run every process-assets tap against a compilation.
    ///
    /// Stops at the first tap that returns an error.
    pub fn run_process_assets(&mut self, compilation: &mut Compilation) -> Result<(), PluginError> {
        // Stable: taps of the same stage keep registration order
        self.process_assets.sort_by_key(|t| t.stage);

        for tap in &mut self.process_assets {
            tracing::debug!(plugin = %tap.name, stage = %tap.stage, "process assets");
            (tap.callback)(compilation)?;
        }
        Ok(())
    }
}

//! Raw file copies into the asset table.

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;

use super::{Plugin, PluginError};
use crate::compilation::{Asset, Compilation, Hooks, ProcessAssetsStage};
use crate::config::CopyPattern;

/// Copies files matched by glob patterns into assets.
pub struct CopyPlugin {
    patterns: Vec<CopyPattern>,
}

impl CopyPlugin {
    /// Name used for taps and as asset producer.
    pub const NAME: &'static str = "CopyPlugin";

    /// Create a plugin for the given copy rules.
    pub fn new(patterns: Vec<CopyPattern>) -> Self {
        Self { patterns }
    }

    /// The configured copy rules.
    pub fn patterns(&self) -> &[CopyPattern] {
        &self.patterns
    }

    /// Add every matched file to the compilation.
    pub fn process(&self, compilation: &mut Compilation) -> Result<(), PluginError> {
        let context = compilation.context().to_path_buf();

        for pattern in &self.patterns {
            let files = matching_files(&context, &pattern.from)?;
            if files.is_empty() {
                tracing::debug!(from = %pattern.from, "copy pattern matched nothing");
            }

            for file in files {
                let name = render_target(&pattern.to, &context, &file);
                let source = fs::read(&file)
                    .map_err(|source| PluginError::Io { path: file.clone(), source })?;
                tracing::debug!(file = %file.display(), asset = %name, "copied");
                compilation.assets_mut().emit_asset(name, Asset::raw(source, Self::NAME))?;
            }
        }
        Ok(())
    }
}

impl Plugin for CopyPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply<'a>(&'a self, hooks: &mut Hooks<'a>) {
        hooks.tap_process_assets(Self::NAME, ProcessAssetsStage::Additional, move |compilation| {
            self.process(compilation)
        });
    }
}

/// Files under `context` matching `pattern`, sorted.
fn matching_files(context: &Path, pattern: &str) -> Result<Vec<PathBuf>, PluginError> {
    let full_pattern = context.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths = glob(&pattern_str).map_err(|e| PluginError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("error reading path: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Expand `[name]`, `[ext]` and `[path]` for a matched file.
pub fn render_target(template: &str, context: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(context).unwrap_or(file);
    let name = relative.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = relative.extension().map(|s| s.to_string_lossy()).unwrap_or_default();

    let dir: Vec<String> = relative
        .parent()
        .map(|p| p.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect())
        .unwrap_or_default();
    let path = if dir.is_empty() { String::new() } else { format!("{}/", dir.join("/")) };

    template.replace("[path]", &path).replace("[name]", &name).replace("[ext]", &ext)
}

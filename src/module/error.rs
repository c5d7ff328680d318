//! Module loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// A module could not be located, read or evaluated.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleError {
    /// No file or registered factory matches the request
    #[error("Cannot find module '{request}' from '{}'", context.display())]
    NotFound {
        /// The request as written in the pattern
        request: String,
        /// Build context root it was resolved against
        context: PathBuf,
    },
    /// The module file exists but could not be read
    #[error("Failed to read module {}: {source}", path.display())]
    Read {
        /// Resolved module path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The module's content failed to parse
    #[error("Failed to evaluate module {}: {message}", path.display())]
    Parse {
        /// Resolved module path
        path: PathBuf,
        /// Parser message
        message: String,
    },
    /// No loader handles this file type
    #[error("No loader for module {} (extension '{extension}')", path.display())]
    UnsupportedExtension {
        /// Resolved module path
        path: PathBuf,
        /// The unsupported extension (empty when missing)
        extension: String,
    },
    /// A factory export was required
    #[error("Module {} exports a {kind}, not a factory", path.display())]
    NotCallable {
        /// Resolved module path
        path: PathBuf,
        /// Export shape that was found instead
        kind: &'static str,
    },
}

impl ModuleError {
    /// Path of the module involved, when it was resolved.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ModuleError::NotFound { .. } => None,
            ModuleError::Read { path, .. }
            | ModuleError::Parse { path, .. }
            | ModuleError::UnsupportedExtension { path, .. }
            | ModuleError::NotCallable { path, .. } => Some(path),
        }
    }
}

//! Asset pipeline plugins.
//!
//! Two plugins ship with taskconf:
//! - [`CopyPlugin`] adds raw files (CSV case data and the like) at the
//!   `Additional` stage.
//! - [`TaskConfPlugin`] turns task modules into JSON task configs at the
//!   `Optimize` stage, after every other producer has run.

pub mod copy;
pub mod task_conf;

pub use copy::CopyPlugin;
pub use task_conf::{PatternError, PatternErrorKind, TaskConfPlugin};

use std::path::PathBuf;
use thiserror::Error;

use crate::compilation::{AssetError, Hooks};

/// A participant in the build.
pub trait Plugin {
    /// Plugin name, used for taps and diagnostics.
    fn name(&self) -> &str;

    /// Register callbacks on the compilation hooks.
    fn apply<'a>(&'a self, hooks: &mut Hooks<'a>);
}

/// Errors that abort the whole compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PluginError {
    /// A glob pattern did not parse
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },
    /// A file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// Two copy rules produced the same asset name
    #[error(transparent)]
    Asset(#[from] AssetError),
}

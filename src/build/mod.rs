//! Build pipeline module for taskconf
//!
//! Turns the patterns of a `taskconf.toml` project into task config files.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Expand explicit patterns and the `[tasks]` shorthand
//! - **Compilation**: Apply the plugins and run the process-assets hook
//! - **Emission**: Write the finished assets to the output directory
//!
//! # Example
//!
//! ```ignore
//! use taskconf::build::{BuildContext, BuildPipeline};
//! use taskconf::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let result = BuildPipeline::new(context).build()?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod pattern;
pub mod pipeline;
pub mod result;

pub use context::*;
pub use discovery::*;
pub use pattern::*;
pub use pipeline::*;
pub use result::*;

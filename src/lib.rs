//! taskconf - Build-time compiler for test-engine task configs
//!
//! This library provides functionality to:
//! - Resolve task modules (JSON, JSON5, TOML, interpreted scripts, native factories)
//! - Materialize them with shared runtime data into JSON task configs
//! - Run them through an asset pipeline with plugins and emit the results
//!
//! ```ignore
//! use taskconf::build::{BuildContext, BuildPipeline, Pattern};
//! use taskconf::config::default_config;
//!
//! let mut config = default_config();
//! config.patterns.push(Pattern::new("./redis/task.json5", "redis/task.conf"));
//! let result = BuildPipeline::new(BuildContext::new(config, project_root)).build()?;
//! assert!(result.is_success());
//! ```

pub mod build;
pub mod cli;
pub mod compilation;
pub mod config;
pub mod logging;
pub mod materialize;
pub mod module;
pub mod plugin;
pub mod watch;

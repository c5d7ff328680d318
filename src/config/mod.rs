//! Configuration module for the taskconf build system
//!
//! Provides types and parsing for `taskconf.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::*;

//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod show;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::loader::{find_config, load_config, parse_data_arg, CONFIG_FILE_NAME};
use crate::config::{ConfigError, ExportPolicy, RuntimeData, TaskConfConfig};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// taskconf - Compile task modules into JSON task configs
#[derive(Parser)]
#[command(name = "taskconf")]
#[command(about = "taskconf - Compile task modules into JSON task configs for the test engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build all task configs of the project
    Build {
        /// Path to taskconf.toml (default: search upwards from the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the context root modules are resolved against
        #[arg(long)]
        context: Option<PathBuf>,

        /// Override output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Runtime data: a JSON object, or @file (json, json5, toml)
        #[arg(short, long)]
        data: Option<String>,

        /// Only build patterns whose output matches this glob (repeatable)
        #[arg(long)]
        filter: Vec<String>,

        /// Allowed module exports: auto, factory
        #[arg(long, value_enum)]
        exports: Option<ExportPolicy>,

        /// Watch for changes and rebuild automatically
        #[arg(short, long)]
        watch: bool,

        /// Dry run (compile in memory and list assets without writing)
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first failing pattern
        #[arg(long)]
        fail_fast: bool,

        /// Write assets even when some patterns failed
        #[arg(long)]
        emit_on_errors: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the JSON a single module materializes to
    Show {
        /// Module path relative to the context root
        module: String,

        /// Path to taskconf.toml (default: search upwards from the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the context root modules are resolved against
        #[arg(long)]
        context: Option<PathBuf>,

        /// Runtime data: a JSON object, or @file (json, json5, toml)
        #[arg(short, long)]
        data: Option<String>,

        /// Allowed module exports: auto, factory
        #[arg(long, value_enum)]
        exports: Option<ExportPolicy>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Load the project configuration and its root directory.
///
/// An explicit `--config` must exist. Without it, the nearest
/// `taskconf.toml` above the working directory is used, or defaults.
pub(crate) fn load_project(
    config: Option<&Path>,
    verbose: bool,
) -> Result<(TaskConfConfig, PathBuf), ConfigError> {
    let cwd = std::env::current_dir()?;
    let config_path = match config {
        Some(path) => Some(crate::config::loader::resolve_path(&cwd, path)),
        None => find_config(),
    };

    match config_path {
        Some(path) => {
            if verbose {
                println!("Using config: {}", path.display());
            }
            let cfg = load_config(Some(&path))?;
            let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
            Ok((cfg, root))
        }
        None => {
            if verbose {
                println!("No {} found, using defaults", CONFIG_FILE_NAME);
            }
            Ok((crate::config::default_config(), cwd))
        }
    }
}

/// Parse a `--data` argument relative to the working directory.
pub(crate) fn load_data_arg(data: Option<&str>) -> Result<Option<RuntimeData>, ConfigError> {
    match data {
        Some(arg) => {
            let cwd = std::env::current_dir()?;
            parse_data_arg(arg, &cwd).map(Some)
        }
        None => Ok(None),
    }
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            context,
            out,
            data,
            filter,
            exports,
            watch,
            dry_run,
            fail_fast,
            emit_on_errors,
            verbose,
        } => {
            crate::logging::init(verbose);
            build::run_build(build::BuildArgs {
                config,
                context,
                out,
                data,
                filter,
                exports,
                watch,
                dry_run,
                fail_fast,
                emit_on_errors,
                verbose,
            })
        }
        Commands::Show { module, config, context, data, exports, verbose } => {
            crate::logging::init(verbose);
            show::run_show(
                &module,
                config.as_deref(),
                context.as_deref(),
                data.as_deref(),
                exports,
                verbose,
            )
        }
    }
}

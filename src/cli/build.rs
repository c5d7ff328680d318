//! Build command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use super::{load_data_arg, load_project, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildPipeline};
use crate::config::loader::{merge_cli_overrides, CliOverrides};
use crate::config::ExportPolicy;

/// Arguments of `taskconf build`
pub struct BuildArgs {
    pub config: Option<PathBuf>,
    pub context: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub data: Option<String>,
    pub filter: Vec<String>,
    pub exports: Option<ExportPolicy>,
    pub watch: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
    pub emit_on_errors: bool,
    pub verbose: bool,
}

/// Run the build command
pub fn run_build(args: BuildArgs) -> ExitCode {
    let (mut config, project_root) = match load_project(args.config.as_deref(), args.verbose) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let data = match load_data_arg(args.data.as_deref()) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    // Apply CLI overrides to config
    let overrides = CliOverrides {
        out: args.out,
        context: args.context,
        data,
        exports: args.exports,
        fail_fast: args.fail_fast.then_some(true),
        emit_on_errors: args.emit_on_errors.then_some(true),
    };
    merge_cli_overrides(&mut config, &overrides);

    let mut context = BuildContext::new(config, project_root).with_verbose(args.verbose);
    if !args.filter.is_empty() {
        context = context.with_filter(args.filter);
    }

    // Check context directory exists
    let context_dir = context.context_dir();
    if !context_dir.exists() {
        eprintln!("Error: Context directory not found: {}", context_dir.display());
        eprintln!("Create the directory or specify a different path with --context");
        return ExitCode::from(EXIT_ERROR);
    }

    if args.dry_run {
        println!("Dry run - would build:");
        println!("  Context: {}", context_dir.display());
        println!("  Output: {}", context.out_dir().display());

        let pipeline = BuildPipeline::new(context).with_dry_run(true);
        return match pipeline.build() {
            Ok(result) => {
                println!("  Assets: {}", result.assets.len());
                for asset in &result.assets {
                    println!("    - {}", asset);
                }
                if result.is_success() {
                    ExitCode::from(EXIT_SUCCESS)
                } else {
                    eprintln!("{}", result.summary());
                    ExitCode::from(EXIT_ERROR)
                }
            }
            Err(e) => {
                eprintln!("Build error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let pipeline = BuildPipeline::new(context);

    if args.watch {
        println!("Starting watch mode...");
        println!("Press Ctrl+C to stop");
        println!();

        return match crate::watch::watch_and_rebuild(&pipeline) {
            Ok(()) => ExitCode::from(EXIT_SUCCESS),
            Err(e) => {
                eprintln!("Watch error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    match pipeline.build() {
        Ok(result) => {
            if result.is_success() {
                println!("{}", result.summary());
                ExitCode::from(EXIT_SUCCESS)
            } else {
                eprintln!("{}", result.summary());
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

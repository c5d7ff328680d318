//! Show command implementation

use std::path::Path;
use std::process::ExitCode;

use super::{load_data_arg, load_project, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::BuildContext;
use crate::config::loader::{load_runtime_data, merge_cli_overrides, CliOverrides};
use crate::config::ExportPolicy;
use crate::plugin::TaskConfPlugin;

/// Execute the show command - print the JSON one module materializes to
pub fn run_show(
    module: &str,
    config: Option<&Path>,
    context: Option<&Path>,
    data: Option<&str>,
    exports: Option<ExportPolicy>,
    verbose: bool,
) -> ExitCode {
    let (mut config, project_root) = match load_project(config, verbose) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let data = match load_data_arg(data) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let overrides = CliOverrides {
        context: context.map(Path::to_path_buf),
        data,
        exports,
        ..Default::default()
    };
    merge_cli_overrides(&mut config, &overrides);

    let ctx = BuildContext::new(config, project_root);
    let runtime_data = match load_runtime_data(ctx.config(), ctx.project_root()) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let plugin = TaskConfPlugin::from_config(ctx.config(), vec![], runtime_data);
    match plugin.render(&ctx.context_dir(), module) {
        Ok(Some(json)) => {
            println!("{}", json);
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(None) => {
            eprintln!("{} exports null; a build would skip it", module);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}: {}", module, e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

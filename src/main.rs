//! taskconf - Command-line tool compiling task modules into JSON task configs

use std::process::ExitCode;

use taskconf::cli;

fn main() -> ExitCode {
    cli::run()
}

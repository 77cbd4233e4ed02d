mod args;
mod commands;
mod elf;
mod error;
mod landmarks;
mod logging;
mod process;
#[cfg(test)]
mod testing;
mod utils;

use args::Cli;
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    utils::generate_style_file();

    let cli = Cli::parse();
    logging::init_tracing(cli.debug);
    let options = cli.options();
    debug!("{options:?}");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;
    for (i, target) in cli.targets.iter().enumerate() {
        if i > 0 && writeln!(out).is_err() {
            return ExitCode::FAILURE;
        }
        if let Err(err) = commands::print_target(&mut out, target, &options) {
            // partial output should come before the warning
            let _ = out.flush();
            if err.is_permission_denied() {
                utils::warn(&format!("{target}: permission denied, skipping"));
            } else {
                utils::warn(&format!("{target}: {err}"));
            }
            failed = true;
        }
    }

    if out.flush().is_err() || failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

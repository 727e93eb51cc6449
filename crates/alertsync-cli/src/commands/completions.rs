//! Shell completion generation

use std::io;
use std::process::ExitCode;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::Cli;

/// Print the completion script for `shell` to stdout
pub fn run_completions(shell: Shell) -> ExitCode {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "alertsync", &mut io::stdout());
    ExitCode::SUCCESS
}

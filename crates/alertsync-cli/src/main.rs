//! alertsync CLI
//!
//! Validates alert rules kept as JSON files and syncs them to an alerting
//! backend.
//!
//! Exit codes: 0 on success, 1 on validation failure or any fatal error,
//! 2 when apply finished with some operations failed or skipped.

mod cli;
mod commands;
mod context;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(command = ?cli.command, backend = ?cli.backend, "Parsed arguments");

    execute_command(cli)
}

/// Logs go to stderr; stdout is reserved for reports.
///
/// `-v` forces debug level, otherwise `RUST_LOG` applies with a default of
/// `warn`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Only fails if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

fn execute_command(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Validate { rules, format } => commands::run_validate(&rules, format),
        Commands::Plan {
            rules,
            format,
            diff,
        } => commands::run_plan(&rules, &cli.backend, format, diff),
        Commands::Apply {
            rules,
            format,
            diff,
            yes,
        } => commands::run_apply(&rules, &cli.backend, format, diff, yes),
        Commands::Export { dir } => commands::run_export(&dir, &cli.backend),
        Commands::Completions { shell } => Ok(commands::run_completions(shell)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn test_missing_url_is_reported() {
        let error = crate::error::CliError::from(alertsync_core::Error::MissingBackendUrl);
        assert!(error.to_string().contains("GRAFANA_URL"));
    }
}

//! Apply command implementation
//!
//! Prints the plan, asks for confirmation and executes it. Operations that
//! succeeded stay in effect when others fail; the report says which is which.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use colored::Colorize;
use dialoguer::Confirm;

use alertsync_core::{Plan, SyncEngine};

use super::{EXIT_PARTIAL, failure, load_valid};
use crate::cli::{BackendArgs, Format, RulesArgs};
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::output;

/// Run the apply command
pub fn run_apply(
    rules: &RulesArgs,
    backend: &BackendArgs,
    format: Format,
    diff: bool,
    yes: bool,
) -> Result<ExitCode> {
    let Some(local) = load_valid(rules, format)? else {
        return Ok(failure());
    };

    let ctx = RunContext::connect(&rules.dir, backend)?;
    let planning = SyncEngine::new(&ctx.backend, ctx.settings.deadline());
    let plan = ctx.runtime.block_on(planning.plan(&local.rules))?;

    if plan.is_empty() {
        print!("{}", output::plan(&plan, format, diff)?);
        return Ok(ExitCode::SUCCESS);
    }

    if format == Format::Human {
        print!("{}", output::plan(&plan, format, diff)?);
    } else {
        // Machine formats keep stdout to the final report document
        eprint!("{}", output::plan(&plan, Format::Human, diff)?);
    }

    if !confirm(&plan, yes)? {
        eprintln!("Apply cancelled. Nothing was changed.");
        return Ok(ExitCode::SUCCESS);
    }

    // The prompt may have waited indefinitely; apply gets its own run timeout
    let applying = SyncEngine::new(&ctx.backend, ctx.settings.deadline());
    let report = ctx.runtime.block_on(applying.apply(&plan));

    if format == Format::Human {
        println!();
    }
    print!("{}", output::apply_report(&report, format)?);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

/// Decide whether to go ahead with `plan`.
///
/// `--yes` skips the prompt. Without it a terminal is required on stdin;
/// scripts and CI must opt in explicitly.
fn confirm(plan: &Plan, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::user(
            "Refusing to apply in a non-interactive session without --yes",
        ));
    }

    let pending = plan.pending_uids().len();
    let answer = Confirm::new()
        .with_prompt(format!(
            "Apply {} change(s) to the backend?",
            pending.to_string().bold()
        ))
        .default(false)
        .interact()?;
    Ok(answer)
}

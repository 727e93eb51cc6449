//! Plan command implementation
//!
//! Shows what apply would change without writing anything.

use std::process::ExitCode;

use alertsync_core::SyncEngine;

use super::{failure, load_valid};
use crate::cli::{BackendArgs, Format, RulesArgs};
use crate::context::RunContext;
use crate::error::Result;
use crate::output;

/// Run the plan command
pub fn run_plan(
    rules: &RulesArgs,
    backend: &BackendArgs,
    format: Format,
    diff: bool,
) -> Result<ExitCode> {
    let Some(local) = load_valid(rules, format)? else {
        return Ok(failure());
    };

    let ctx = RunContext::connect(&rules.dir, backend)?;
    let engine = SyncEngine::new(&ctx.backend, ctx.settings.deadline());
    let plan = ctx.runtime.block_on(engine.plan(&local.rules))?;

    print!("{}", output::plan(&plan, format, diff)?);
    Ok(ExitCode::SUCCESS)
}

//! Validate command implementation

use std::process::ExitCode;

use alertsync_core::LocalRules;

use super::failure;
use crate::cli::{Format, RulesArgs};
use crate::error::Result;
use crate::output;

/// Run the validate command
///
/// Loads and validates every rule without touching the backend.
pub fn run_validate(rules: &RulesArgs, format: Format) -> Result<ExitCode> {
    let local = LocalRules::load(&rules.dir, rules.policies.as_deref())?;
    print!("{}", output::validation(&local.report, format)?);

    if local.report.has_errors() {
        Ok(failure())
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

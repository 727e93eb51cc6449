//! Command implementations for alertsync-cli

pub mod apply;
pub mod completions;
pub mod export;
pub mod plan;
pub mod validate;

pub use apply::run_apply;
pub use completions::run_completions;
pub use export::run_export;
pub use plan::run_plan;
pub use validate::run_validate;

use std::process::ExitCode;

use alertsync_core::LocalRules;

use crate::cli::{Format, RulesArgs};
use crate::error::Result;
use crate::output;

/// Exit code when some apply operations failed or were skipped
pub const EXIT_PARTIAL: u8 = 2;

/// Load and validate the rules directory, printing the report when it has
/// errors.
///
/// Returns `None` when validation failed and the command must stop with
/// exit code 1 before contacting the backend.
pub(crate) fn load_valid(rules: &RulesArgs, format: Format) -> Result<Option<LocalRules>> {
    let local = LocalRules::load(&rules.dir, rules.policies.as_deref())?;
    if local.report.has_errors() {
        print!("{}", output::validation(&local.report, format)?);
        eprintln!(
            "Refusing to contact the backend: {} rule error(s) must be fixed first.",
            local.report.error_count()
        );
        return Ok(None);
    }
    if local.report.warning_count() > 0 {
        tracing::warn!(warnings = local.report.warning_count(), "Rules have warnings");
    }
    Ok(Some(local))
}

pub(crate) fn failure() -> ExitCode {
    ExitCode::from(1)
}

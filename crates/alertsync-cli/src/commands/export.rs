//! Export command implementation

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use alertsync_core::SyncEngine;

use crate::cli::BackendArgs;
use crate::context::RunContext;
use crate::error::Result;

/// Run the export command
///
/// Writes every backend rule to `<dir>/<folderUID>/<uid>.json`, ready to be
/// committed and later applied back.
pub fn run_export(dir: &Path, backend: &BackendArgs) -> Result<ExitCode> {
    let ctx = RunContext::connect(dir, backend)?;
    let engine = SyncEngine::new(&ctx.backend, ctx.settings.deadline());
    let written = ctx.runtime.block_on(engine.export(dir))?;

    println!(
        "{} Exported {} rule(s) to {}",
        "OK".green().bold(),
        written.len(),
        dir.display().to_string().cyan()
    );
    Ok(ExitCode::SUCCESS)
}

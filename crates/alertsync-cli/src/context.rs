//! Per-run context: resolved settings, backend and async runtime
//!
//! Each run builds exactly one backend from the resolved settings and
//! drives it on a single-threaded runtime. Nothing is process-wide.

use std::path::Path;

use tokio::runtime::Runtime;

use alertsync_core::{ConfigResolver, Settings};
use alertsync_remote::HttpBackend;

use crate::cli::BackendArgs;
use crate::error::Result;

/// Everything a backend-facing command needs
pub struct RunContext {
    pub settings: Settings,
    pub backend: HttpBackend,
    pub runtime: Runtime,
}

impl RunContext {
    /// Resolve settings for `dir` and connect to the configured backend
    pub fn connect(dir: &Path, args: &BackendArgs) -> Result<Self> {
        let settings = resolve_settings(dir, args)?;
        let backend = HttpBackend::new(&settings.backend_config()?, settings.retry.clone())?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        tracing::debug!(url = ?settings.url, "Connected backend");
        Ok(Self {
            settings,
            backend,
            runtime,
        })
    }
}

/// Layered settings for a rules directory, with flags and env on top
pub fn resolve_settings(dir: &Path, args: &BackendArgs) -> Result<Settings> {
    let resolver = match &args.config {
        Some(path) => ConfigResolver::with_user_config(dir, path),
        None => ConfigResolver::new(dir),
    };
    Ok(resolver.resolve(&args.overrides())?)
}

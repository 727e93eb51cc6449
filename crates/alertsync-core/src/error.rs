//! Error types for alertsync-core

use std::path::PathBuf;

/// Result type for alertsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in alertsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration layer is unreadable, malformed or holds a forbidden key
    #[error("Invalid config at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// No backend URL in any configuration layer
    #[error("No backend URL configured (set GRAFANA_URL, --url, or [backend].url)")]
    MissingBackendUrl,

    /// Validation found error violations; nothing was sent to the backend
    #[error("Validation failed with {errors} error(s)")]
    ValidationFailed { errors: usize },

    // Transparent wrappers for underlying crate errors
    /// Loader or model error from alertsync-model
    #[error(transparent)]
    Model(#[from] alertsync_model::Error),

    /// Backend error from alertsync-remote
    #[error(transparent)]
    Remote(#[from] alertsync_remote::RemoteError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

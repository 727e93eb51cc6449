//! Error types for alertsync-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a CLI run with exit code 1
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from alertsync-core
    #[error(transparent)]
    Core(#[from] alertsync_core::Error),

    /// Error from alertsync-remote
    #[error(transparent)]
    Remote(#[from] alertsync_remote::RemoteError),

    /// Error from alertsync-model
    #[error(transparent)]
    Model(#[from] alertsync_model::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}

//! Error types for alertsync-remote

use std::fmt;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Why a request never produced a usable response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connection,
    ServerError { status: u16 },
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::ServerError { status } => write!(f, "server error {status}"),
        }
    }
}

/// Errors returned by a [`crate::RuleBackend`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Timeout, connection failure or 5xx. Retried.
    #[error("transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },

    #[error("rule {uid} not found")]
    NotFound { uid: String },

    /// The rule changed on the backend since it was read
    #[error("conflict on rule {uid}: {message} (re-run plan)")]
    Conflict { uid: String, message: String },

    /// Any other 4xx. Not retried.
    #[error("backend rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from backend: {0}")]
    Decode(String),

    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl RemoteError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportKind::Timeout,
            message: message.into(),
        }
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportKind::ServerError { status },
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                kind: TransportKind::Timeout,
                ..
            }
        )
    }
}

//! Error types for alertsync-model

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Malformed rule at {path}: {defect}")]
    MalformedRule { path: PathBuf, defect: Defect },

    #[error("Invalid notification policy document at {path}: {message}")]
    InvalidPolicy { path: PathBuf, message: String },

    #[error("Refusing to use {component:?} as a path component")]
    UnsafePathComponent { component: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, defect: Defect) -> Self {
        Self::MalformedRule {
            path: path.into(),
            defect,
        }
    }
}

/// What is structurally wrong with a rule document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Defect {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` has the wrong type: {message}")]
    WrongType { field: String, message: String },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("duplicate uid `{uid}` (first defined in {first})")]
    DuplicateUid { uid: String, first: PathBuf },
}

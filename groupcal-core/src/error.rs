//! Error types for groupcal.

use thiserror::Error;

/// Errors that can occur in groupcal operations.
#[derive(Error, Debug)]
pub enum GroupCalError {
    /// Bad input the caller can correct. Raised before anything is written.
    #[error("{0}")]
    Validation(String),

    #[error("Not allowed: {0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error category, used when reporting failures to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Store,
}

impl GroupCalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GroupCalError::Validation(_) => ErrorKind::Validation,
            GroupCalError::Authorization(_) => ErrorKind::Authorization,
            GroupCalError::NotFound(_) => ErrorKind::NotFound,
            GroupCalError::Store(_)
            | GroupCalError::Config(_)
            | GroupCalError::Io(_)
            | GroupCalError::Serialization(_) => ErrorKind::Store,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        GroupCalError::Validation(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        GroupCalError::Authorization(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        GroupCalError::NotFound(what.into())
    }
}

impl From<serde_json::Error> for GroupCalError {
    fn from(e: serde_json::Error) -> Self {
        GroupCalError::Serialization(e.to_string())
    }
}

/// Result type alias for groupcal operations.
pub type GroupCalResult<T> = Result<T, GroupCalError>;

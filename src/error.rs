// src/error.rs

use serde::Serialize;
use thiserror::Error;

/// Result type alias used across the cloner.
pub type Result<T> = std::result::Result<T, CloneError>;

/// Every way a clone can fail.
///
/// 🛡️ Zero-Leak: every `String` payload has already been scrubbed of the
/// access token and the credential artifact path before the variant is built.
/// Nothing in here may be formatted from raw process output.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("invalid clone argument: {0}")]
    InvalidArgument(String),

    #[error("version-control tool not found: {0}")]
    ToolNotFound(String),

    #[error("failed to write ephemeral credential: {0}")]
    CredentialWrite(String),

    #[error("destination conflict: {0}")]
    DestinationConflict(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("clone timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("git clone failed: {0}")]
    CloneFailed(String),

    /// Destination filesystem failure that is not a conflict.
    #[error("io error: {0}")]
    Io(String),
}

/// Stable, machine-readable discriminant of [`CloneError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    InvalidArgument,
    ToolNotFound,
    CredentialWrite,
    DestinationConflict,
    AuthenticationFailed,
    RepositoryNotFound,
    NetworkError,
    Timeout,
    CloneFailed,
    Io,
}

impl CloneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloneError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            CloneError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CloneError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            CloneError::CredentialWrite(_) => ErrorKind::CredentialWrite,
            CloneError::DestinationConflict(_) => ErrorKind::DestinationConflict,
            CloneError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            CloneError::RepositoryNotFound(_) => ErrorKind::RepositoryNotFound,
            CloneError::NetworkError(_) => ErrorKind::NetworkError,
            CloneError::Timeout { .. } => ErrorKind::Timeout,
            CloneError::CloneFailed(_) => ErrorKind::CloneFailed,
            CloneError::Io(_) => ErrorKind::Io,
        }
    }
}

//! CLI error types.

use swap_persist::PersistError;
use swap_service::ServiceError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The service refused the operation.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// No token was given and none is saved.
    #[error("not logged in: run `skillswap auth login` or pass --token")]
    NotLoggedIn,

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Saved session could not be read or written.
    #[error("session file error: {0}")]
    Session(#[from] PersistError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Stable machine-readable code, matching the service codes where one
    /// applies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Service(e) => e.code(),
            Self::NotLoggedIn => "unauthenticated",
            Self::InvalidArgument(_) => "invalid_input",
            Self::Session(_) => "storage",
            Self::Format(_) | Self::Io(_) => "internal",
        }
    }
}

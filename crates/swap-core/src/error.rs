//! Error types for swap-core.

use thiserror::Error;

/// Errors raised when parsing or combining core primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid credit amount (overflow, underflow, or malformed).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid identifier.
    #[error("invalid id: {0}")]
    InvalidId(String),
}

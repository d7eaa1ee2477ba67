//! Error types for identity and session handling.

use thiserror::Error;

/// Errors that can occur in account and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email address failed validation.
    #[error("invalid email: {reason}")]
    InvalidEmail {
        /// The reason the email is invalid.
        reason: String,
    },

    /// Display name failed validation.
    #[error("invalid display name: {reason}")]
    InvalidDisplayName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// Password does not meet the policy.
    #[error("weak password: {reason}")]
    WeakPassword {
        /// The reason the password was rejected.
        reason: String,
    },

    /// An account already exists for this email.
    #[error("email already registered: {email}")]
    EmailTaken {
        /// The conflicting email.
        email: String,
    },

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account is suspended.
    #[error("account suspended: {id}")]
    AccountSuspended {
        /// The suspended user's ID.
        id: String,
    },

    /// User not found.
    #[error("user not found: {id}")]
    UserNotFound {
        /// The ID of the user that was not found.
        id: String,
    },

    /// No valid session for the presented token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Authenticated, but not allowed to perform the operation.
    #[error("permission denied: {reason}")]
    PermissionDenied {
        /// The reason permission was denied.
        reason: String,
    },

    /// Invalid role name.
    #[error("invalid role: {value}")]
    InvalidRole {
        /// The unparseable role.
        value: String,
    },

    /// Password hashing failed.
    #[error("crypto error: {reason}")]
    CryptoError {
        /// The reason the crypto operation failed.
        reason: String,
    },
}

/// Result type alias for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

//! Error types for swap-service.

use swap_auth::AuthError;
use swap_ledger::LedgerError;
use swap_market::MarketError;
use swap_persist::PersistError;
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the [`SkillSwap`](crate::SkillSwap) facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Identity or session failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Marketplace rule violation.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Snapshot could not be read or written.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Configuration rejected.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong.
        reason: String,
    },
}

impl ServiceError {
    /// Stable machine-readable code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth(e) => match e {
                AuthError::Unauthenticated => "unauthenticated",
                AuthError::InvalidCredentials => "invalid_credentials",
                AuthError::AccountSuspended { .. } => "account_suspended",
                AuthError::PermissionDenied { .. } => "forbidden",
                AuthError::EmailTaken { .. } => "conflict",
                AuthError::UserNotFound { .. } => "not_found",
                AuthError::CryptoError { .. } => "internal",
                AuthError::InvalidEmail { .. }
                | AuthError::InvalidDisplayName { .. }
                | AuthError::WeakPassword { .. }
                | AuthError::InvalidRole { .. } => "invalid_input",
            },
            Self::Ledger(e) => match e {
                LedgerError::InsufficientCredits { .. } => "insufficient_credits",
                LedgerError::AccountNotFound { .. } => "not_found",
                LedgerError::AccountExists { .. } => "conflict",
                LedgerError::ZeroAmount | LedgerError::WrongDirection { .. } => "invalid_input",
                LedgerError::Overflow { .. } | LedgerError::BalanceMismatch { .. } => "internal",
            },
            Self::Market(e) => match e {
                MarketError::NotFound { .. } => "not_found",
                MarketError::NotAuthorized { .. } => "forbidden",
                MarketError::InvalidStateTransition { .. } | MarketError::NotRateable { .. } => {
                    "invalid_state"
                }
                MarketError::AlreadyLinked { .. } => "conflict",
                MarketError::NegotiationExpired { .. } => "expired",
                MarketError::InvalidSkill { .. }
                | MarketError::InvalidRequest { .. }
                | MarketError::InvalidTerms { .. }
                | MarketError::InvalidScore { .. } => "invalid_input",
            },
            Self::Persist(_) => "storage",
            Self::Config { .. } => "config",
        }
    }

    /// Shorthand for a permission failure.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Auth(AuthError::PermissionDenied {
            reason: reason.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ServiceError::Auth(AuthError::InvalidCredentials), "invalid_credentials")]
    #[test_case(ServiceError::Auth(AuthError::Unauthenticated), "unauthenticated")]
    #[test_case(ServiceError::Ledger(LedgerError::InsufficientCredits { required: 5, available: 1 }), "insufficient_credits")]
    #[test_case(ServiceError::Market(MarketError::InvalidScore { score: 6 }), "invalid_input")]
    #[test_case(ServiceError::forbidden("admins only"), "forbidden")]
    fn error_codes(err: ServiceError, code: &str) {
        assert_eq!(err.code(), code);
    }

    #[test]
    fn display_is_transparent() {
        let err: ServiceError = MarketError::not_found("request", "r-1").into();
        assert_eq!(err.to_string(), "request not found: r-1");
    }
}

//! Error types for swap-market.

use thiserror::Error;

/// Result type alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur in marketplace operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (`skill`, `request`, ...).
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// The caller is not allowed to act on this record.
    #[error("not authorized: {reason}")]
    NotAuthorized {
        /// What was refused.
        reason: String,
    },

    /// Invalid state transition.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// Invalid skill listing.
    #[error("invalid skill: {reason}")]
    InvalidSkill {
        /// Why the skill was rejected.
        reason: String,
    },

    /// Invalid service request.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// Exchange terms are incomplete or inconsistent.
    #[error("invalid terms: {reason}")]
    InvalidTerms {
        /// Why the terms were rejected.
        reason: String,
    },

    /// The match already produced a transaction.
    #[error("match {match_id} already has transaction {transaction_id}")]
    AlreadyLinked {
        /// The match.
        match_id: String,
        /// The existing transaction.
        transaction_id: String,
    },

    /// The proposal passed its expiry before a response arrived.
    #[error("negotiation expired: {id}")]
    NegotiationExpired {
        /// The expired negotiation.
        id: String,
    },

    /// Rating score outside 1..=5.
    #[error("rating score must be between 1 and 5, got {score}")]
    InvalidScore {
        /// The rejected score.
        score: u8,
    },

    /// Ratings are only accepted for completed transactions.
    #[error("transaction {id} cannot be rated while {status}")]
    NotRateable {
        /// The transaction.
        id: String,
        /// Its current status.
        status: String,
    },
}

impl MarketError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a not-authorized error.
    #[must_use]
    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-terms error.
    #[must_use]
    pub fn invalid_terms(reason: impl Into<String>) -> Self {
        Self::InvalidTerms {
            reason: reason.into(),
        }
    }
}

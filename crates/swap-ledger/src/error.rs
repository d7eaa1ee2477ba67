//! Error types for swap-ledger.

use thiserror::Error;

use crate::entry::EntryType;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while posting to the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// No ledger account has been opened for this user.
    #[error("ledger account not found: {user}")]
    AccountNotFound {
        /// The user without an account.
        user: String,
    },

    /// The account was already opened.
    #[error("ledger account already open: {user}")]
    AccountExists {
        /// The user whose account exists.
        user: String,
    },

    /// Postings must move at least one credit.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Debit larger than the available balance.
    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits {
        /// Amount the debit needed.
        required: u64,
        /// Balance at the time of the debit.
        available: i64,
    },

    /// Entry type used with the wrong operation (e.g. `spent` on a credit).
    #[error("entry type {entry_type} cannot be used for a {operation}")]
    WrongDirection {
        /// The offending entry type.
        entry_type: EntryType,
        /// `credit` or `debit`.
        operation: &'static str,
    },

    /// Balance arithmetic overflowed.
    #[error("balance overflow for {user}")]
    Overflow {
        /// The affected user.
        user: String,
    },

    /// The cached balance disagrees with the ledger.
    #[error("balance mismatch for {user}: cached {cached}, ledger {ledger}")]
    BalanceMismatch {
        /// The affected user.
        user: String,
        /// Balance on the account document.
        cached: i64,
        /// Balance according to the entries.
        ledger: i64,
    },
}

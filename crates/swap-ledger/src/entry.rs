//! Credit history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use swap_core::{EntryId, TransactionId, UserId};

/// Which way an entry type moves the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
    /// Either way; used for admin adjustments.
    Either,
}

/// Why the balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Opening balance granted at registration.
    Initial,
    /// Payment received for a completed service.
    Earned,
    /// Credits returned to the payer (reversal or refund).
    Released,
    /// Administrative correction, positive or negative.
    Adjustment,
    /// Payment made for a completed service.
    Spent,
    /// Credits held back for a pending exchange.
    Reserved,
}

impl EntryType {
    /// The direction this type moves the balance.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Initial | Self::Earned | Self::Released => Direction::Credit,
            Self::Spent | Self::Reserved => Direction::Debit,
            Self::Adjustment => Direction::Either,
        }
    }

    /// Returns true if this type may be used with a credit.
    #[must_use]
    pub const fn allows_credit(self) -> bool {
        matches!(self.direction(), Direction::Credit | Direction::Either)
    }

    /// Returns true if this type may be used with a debit.
    #[must_use]
    pub const fn allows_debit(self) -> bool {
        matches!(self.direction(), Direction::Debit | Direction::Either)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Earned => write!(f, "earned"),
            Self::Released => write!(f, "released"),
            Self::Adjustment => write!(f, "adjustment"),
            Self::Spent => write!(f, "spent"),
            Self::Reserved => write!(f, "reserved"),
        }
    }
}

/// Context attached to a posting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Posting {
    /// Transaction that caused the posting, if any.
    pub transaction_id: Option<TransactionId>,
    /// Human-readable description.
    pub description: String,
}

impl Posting {
    /// A posting with only a description.
    #[must_use]
    pub fn note(description: impl Into<String>) -> Self {
        Self {
            transaction_id: None,
            description: description.into(),
        }
    }

    /// A posting tied to a transaction.
    #[must_use]
    pub fn for_transaction(transaction_id: TransactionId, description: impl Into<String>) -> Self {
        Self {
            transaction_id: Some(transaction_id),
            description: description.into(),
        }
    }
}

/// One immutable line of a user's credit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Account owner.
    pub user_id: UserId,
    /// Signed change: positive for credits, negative for debits.
    pub amount: i64,
    /// Reason for the change.
    pub entry_type: EntryType,
    /// Balance immediately after this entry.
    pub balance_after: i64,
    /// Transaction that caused the entry, if any.
    pub transaction_id: Option<TransactionId>,
    /// Human-readable description.
    pub description: String,
    /// When the entry was posted.
    pub created_at: DateTime<Utc>,
}

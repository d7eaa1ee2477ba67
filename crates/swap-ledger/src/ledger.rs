//! The credit ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swap_core::{Credits, EntryId, TransactionId, UserId};
use tracing::{debug, info, warn};

use crate::entry::{CreditEntry, EntryType, Posting};
use crate::error::{LedgerError, Result};

/// A user whose cached balance disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// The affected user.
    pub user_id: UserId,
    /// Balance on the account document.
    pub cached: i64,
    /// Balance according to the entries.
    pub ledger: i64,
}

/// Append-only credit history, one sequence per user.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Ledger {
    accounts: HashMap<UserId, Vec<CreditEntry>>,
}

impl Ledger {
    /// Creates a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an account with an `initial` entry. A zero opening balance is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountExists`] if the account is already open.
    pub fn open_account(
        &mut self,
        user_id: &UserId,
        initial: Credits,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        if self.accounts.contains_key(user_id) {
            return Err(LedgerError::AccountExists {
                user: user_id.to_string(),
            });
        }
        let amount = delta(user_id, initial)?;
        let entry = CreditEntry {
            id: EntryId::new(),
            user_id: user_id.clone(),
            amount,
            entry_type: EntryType::Initial,
            balance_after: amount,
            transaction_id: None,
            description: "Welcome credits".to_string(),
            created_at: now,
        };
        self.accounts.insert(user_id.clone(), vec![entry.clone()]);
        info!(user_id = %user_id, balance = amount, "opened ledger account");
        Ok(entry)
    }

    /// Returns true if an account is open for the user.
    #[must_use]
    pub fn has_account(&self, user_id: &UserId) -> bool {
        self.accounts.contains_key(user_id)
    }

    /// Adds credits.
    ///
    /// # Errors
    ///
    /// Fails for unknown accounts, zero amounts, debit-only entry types, or
    /// overflow.
    pub fn credit(
        &mut self,
        user_id: &UserId,
        amount: Credits,
        entry_type: EntryType,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        if !entry_type.allows_credit() {
            return Err(LedgerError::WrongDirection {
                entry_type,
                operation: "credit",
            });
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let signed = delta(user_id, amount)?;
        self.append(user_id, signed, entry_type, posting, now)
    }

    /// Removes credits.
    ///
    /// # Errors
    ///
    /// Fails for unknown accounts, zero amounts, credit-only entry types, or
    /// when the balance is smaller than the amount.
    pub fn debit(
        &mut self,
        user_id: &UserId,
        amount: Credits,
        entry_type: EntryType,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        if !entry_type.allows_debit() {
            return Err(LedgerError::WrongDirection {
                entry_type,
                operation: "debit",
            });
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let signed = delta(user_id, amount)?;
        let available = self.require_balance(user_id)?;
        if available < signed {
            return Err(LedgerError::InsufficientCredits {
                required: amount.get(),
                available,
            });
        }
        self.append(user_id, -signed, entry_type, posting, now)
    }

    /// Posts a signed administrative adjustment. May leave the balance negative.
    ///
    /// # Errors
    ///
    /// Fails for unknown accounts, a zero delta, or overflow.
    pub fn adjust(
        &mut self,
        user_id: &UserId,
        amount: i64,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.append(user_id, amount, EntryType::Adjustment, posting, now)
    }

    fn append(
        &mut self,
        user_id: &UserId,
        amount: i64,
        entry_type: EntryType,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        let entries = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::AccountNotFound {
                user: user_id.to_string(),
            })?;
        let previous = entries.last().map_or(0, |e| e.balance_after);
        let balance_after = previous
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                user: user_id.to_string(),
            })?;
        let entry = CreditEntry {
            id: EntryId::new(),
            user_id: user_id.clone(),
            amount,
            entry_type,
            balance_after,
            transaction_id: posting.transaction_id,
            description: posting.description,
            created_at: now,
        };
        entries.push(entry.clone());
        debug!(
            user_id = %user_id,
            amount,
            %entry_type,
            balance_after,
            "posted ledger entry"
        );
        Ok(entry)
    }

    /// Current balance: the last entry's `balance_after`.
    #[must_use]
    pub fn balance(&self, user_id: &UserId) -> Option<i64> {
        self.accounts
            .get(user_id)
            .map(|entries| entries.last().map_or(0, |e| e.balance_after))
    }

    fn require_balance(&self, user_id: &UserId) -> Result<i64> {
        self.balance(user_id).ok_or_else(|| LedgerError::AccountNotFound {
            user: user_id.to_string(),
        })
    }

    /// Balance recomputed as the sum of all entry amounts.
    #[must_use]
    pub fn derived_balance(&self, user_id: &UserId) -> Option<i64> {
        self.accounts
            .get(user_id)
            .map(|entries| entries.iter().map(|e| e.amount).sum())
    }

    /// History, newest first, optionally truncated to `limit` entries.
    #[must_use]
    pub fn history(&self, user_id: &UserId, limit: Option<usize>) -> Vec<&CreditEntry> {
        let Some(entries) = self.accounts.get(user_id) else {
            return Vec::new();
        };
        let take = limit.unwrap_or(entries.len());
        entries.iter().rev().take(take).collect()
    }

    /// Every entry tied to a transaction, across all users, oldest first.
    #[must_use]
    pub fn entries_for_transaction(&self, transaction_id: &TransactionId) -> Vec<&CreditEntry> {
        let mut found: Vec<&CreditEntry> = self
            .accounts
            .values()
            .flatten()
            .filter(|e| e.transaction_id.as_ref() == Some(transaction_id))
            .collect();
        found.sort_by_key(|e| e.created_at);
        found
    }

    /// Checks a cached balance against the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BalanceMismatch`] if the cached value, the last
    /// `balance_after`, and the summed amounts do not all agree.
    pub fn verify(&self, user_id: &UserId, cached: i64) -> Result<()> {
        let last = self.require_balance(user_id)?;
        let derived = self.derived_balance(user_id).unwrap_or_default();
        if last != derived || cached != last {
            return Err(LedgerError::BalanceMismatch {
                user: user_id.to_string(),
                cached,
                ledger: derived,
            });
        }
        Ok(())
    }

    /// Compares cached balances against the ledger and reports every mismatch.
    ///
    /// The derived sum is authoritative; users without an account are skipped.
    pub fn reconcile<'a, I>(&self, cached: I) -> Vec<Discrepancy>
    where
        I: IntoIterator<Item = (&'a UserId, i64)>,
    {
        let mut out = Vec::new();
        for (user_id, cached) in cached {
            let Some(ledger) = self.derived_balance(user_id) else {
                continue;
            };
            if ledger != cached {
                warn!(user_id = %user_id, cached, ledger, "cached balance out of sync");
                out.push(Discrepancy {
                    user_id: user_id.clone(),
                    cached,
                    ledger,
                });
            }
        }
        out
    }
}

fn delta(user_id: &UserId, amount: Credits) -> Result<i64> {
    amount.as_delta().map_err(|_| LedgerError::Overflow {
        user: user_id.to_string(),
    })
}

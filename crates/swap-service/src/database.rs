//! The aggregate of every store, persisted as one snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use swap_auth::{SessionStore, UserDirectory};
use swap_core::{Credits, MatchId, TransactionId, UserId};
use swap_ledger::{CreditEntry, EntryType, Ledger, Posting};
use swap_market::{
    ExchangeTerms, Inbox, MatchBook, NegotiationBook, NotificationKind, RatingBook, RequestBoard,
    Reputation, SkillCatalog, Transaction, TransactionBook, TransactionStatus,
};
use tracing::info;

use crate::error::Result;

/// Name of the database snapshot inside the state directory.
pub const DATABASE_FILE: &str = "skillswap";

/// All SkillSwap state.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// Accounts.
    pub users: UserDirectory,
    /// Sessions.
    pub sessions: SessionStore,
    /// Credit history.
    pub ledger: Ledger,
    /// Listed skills.
    pub skills: SkillCatalog,
    /// Service requests.
    pub requests: RequestBoard,
    /// Suggested matches.
    pub matches: MatchBook,
    /// Proposals.
    pub negotiations: NegotiationBook,
    /// Transactions.
    pub transactions: TransactionBook,
    /// Ratings.
    pub ratings: RatingBook,
    /// Notifications.
    pub inbox: Inbox,
}

impl Database {
    /// Delivers a notification.
    pub(crate) fn notify(
        &mut self,
        user: &UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        related: &dyn fmt::Display,
        now: DateTime<Utc>,
    ) {
        self.inbox.notify(user, kind, message, Some(related), now);
    }

    /// Display name for messages, falling back to the ID.
    pub(crate) fn name_of(&self, user: &UserId) -> String {
        self.users
            .get(user)
            .map_or_else(|| user.to_string(), |u| u.display_name.clone())
    }

    /// Provider average used when scoring matches.
    pub(crate) fn provider_reputation(&self, user: &UserId) -> Option<f64> {
        self.reputation_of(user).provider_average()
    }

    /// Reputation from ratings whose transaction was not reversed.
    pub(crate) fn reputation_of(&self, user: &UserId) -> Reputation {
        self.ratings.reputation_where(user, |r| {
            self.transactions
                .get(&r.transaction_id)
                .is_none_or(|tx| tx.status != TransactionStatus::Reversed)
        })
    }

    /// Copies a ledger balance onto the account's cached field.
    fn sync_balance(&mut self, entry: &CreditEntry) -> Result<()> {
        self.users.set_credits(&entry.user_id, entry.balance_after)?;
        Ok(())
    }

    /// Opens a ledger account and caches the opening balance.
    pub(crate) fn open_account(
        &mut self,
        user: &UserId,
        initial: Credits,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        let entry = self.ledger.open_account(user, initial, now)?;
        self.sync_balance(&entry)?;
        Ok(entry)
    }

    /// Posts an admin adjustment and caches the new balance.
    pub(crate) fn adjust(
        &mut self,
        user: &UserId,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditEntry> {
        let entry = self.ledger.adjust(user, amount, Posting::note(reason), now)?;
        self.sync_balance(&entry)?;
        Ok(entry)
    }

    /// Creates a transaction from an accepted match and links it.
    pub(crate) fn open_transaction(
        &mut self,
        match_id: &MatchId,
        terms: ExchangeTerms,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let suggestion = self.matches.require(match_id)?;
        let request = self.requests.require(&suggestion.request_id)?;
        let tx = self.transactions.open(suggestion, request, terms, now)?;
        self.matches.link_transaction(match_id, &tx.id)?;

        let title = request.title.clone();
        for party in [&tx.requester, &tx.provider] {
            self.notify(
                party,
                NotificationKind::TransactionCreated,
                format!("Transaction created for \"{title}\""),
                &tx.id,
                now,
            );
        }
        Ok(tx)
    }

    /// Moves credits for a completed transaction: the requester is debited
    /// (`spent`) and the provider credited (`earned`). Skill swaps move
    /// nothing.
    ///
    /// Runs before the completion is recorded so an unaffordable settlement
    /// leaves the transaction untouched.
    pub(crate) fn settle(&mut self, tx: &Transaction, now: DateTime<Utc>) -> Result<()> {
        let Some(amount) = tx.settlement_amount() else {
            return Ok(());
        };
        let payer = self.name_of(&tx.requester);
        let payee = self.name_of(&tx.provider);
        let debit = self.ledger.debit(
            &tx.requester,
            amount,
            EntryType::Spent,
            Posting::for_transaction(tx.id.clone(), format!("Payment to {payee}")),
            now,
        )?;
        self.sync_balance(&debit)?;
        let credit = self.ledger.credit(
            &tx.provider,
            amount,
            EntryType::Earned,
            Posting::for_transaction(tx.id.clone(), format!("Payment from {payer}")),
            now,
        )?;
        self.sync_balance(&credit)?;
        self.transactions.set_settled(&tx.id, true)?;
        info!(transaction_id = %tx.id, amount = amount.get(), "settled credits");
        Ok(())
    }

    /// Returns settled credits: the requester is refunded (`released`) and
    /// the provider's earning is clawed back with a negative `adjustment`.
    pub(crate) fn refund(&mut self, tx_id: &TransactionId, now: DateTime<Utc>) -> Result<()> {
        let tx = self.transactions.require(tx_id)?.clone();
        if !tx.credits_settled {
            return Ok(());
        }
        let Some(amount) = tx.settlement_amount() else {
            return Ok(());
        };
        let refund = self.ledger.credit(
            &tx.requester,
            amount,
            EntryType::Released,
            Posting::for_transaction(tx.id.clone(), "Refund for reversed transaction"),
            now,
        )?;
        self.sync_balance(&refund)?;
        let signed = amount.as_delta().map_err(|_| swap_ledger::LedgerError::Overflow {
            user: tx.provider.to_string(),
        })?;
        let clawback = self.ledger.adjust(
            &tx.provider,
            -signed,
            Posting::for_transaction(tx.id.clone(), "Reversal of earned credits"),
            now,
        )?;
        self.sync_balance(&clawback)?;
        self.transactions.set_settled(&tx.id, false)?;
        info!(transaction_id = %tx.id, amount = amount.get(), "refunded credits");
        Ok(())
    }

    /// Marks the request behind a completed transaction as completed and
    /// tells both parties they can now rate each other.
    pub(crate) fn finish_completion(&mut self, tx: &Transaction, now: DateTime<Utc>) -> Result<()> {
        self.requests.mark_completed(&tx.request_id, now)?;
        for party in [&tx.requester, &tx.provider] {
            self.notify(
                party,
                NotificationKind::TransactionCompleted,
                "Transaction completed. You can now rate the other party.",
                &tx.id,
                now,
            );
        }
        Ok(())
    }
}

//! Transactions: creation, work, confirmation, cancellation and disputes.

use swap_core::{AttachmentId, MatchId, TransactionId};
use swap_market::{MarketError, NotificationKind, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::facade::SkillSwap;

impl SkillSwap {
    /// The requester opens a transaction on an accepted match using the
    /// request's posted terms.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the requester and the match is `accepted`
    /// without a transaction.
    pub fn create_transaction(&self, token: &str, match_id: &MatchId) -> Result<Transaction> {
        self.write_as(token, |db, me, now| {
            let suggestion = db.matches.require(match_id)?;
            let request = db.requests.require(&suggestion.request_id)?;
            if request.requester != me.user_id {
                return Err(MarketError::not_authorized("only the requester can open a transaction").into());
            }
            let terms = request.terms.clone();
            db.open_transaction(match_id, terms, now)
        })
    }

    /// A single transaction, visible to its parties and admins.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session, an unknown transaction, or an outsider.
    pub fn transaction(&self, token: &str, tx_id: &TransactionId) -> Result<Transaction> {
        self.read_as(token, |db, me, _| {
            let tx = db.transactions.require(tx_id)?;
            if !me.role.is_admin() {
                tx.require_party(&me.user_id)?;
            }
            Ok(tx.clone())
        })
    }

    /// Transactions the caller is party to, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn my_transactions(&self, token: &str) -> Result<Vec<Transaction>> {
        self.read_as(token, |db, me, _| {
            Ok(db.transactions.for_user(&me.user_id).into_iter().cloned().collect())
        })
    }

    /// The provider starts work. The request moves to `in_progress`.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the provider and the transaction is
    /// `pending`.
    pub fn start_transaction(&self, token: &str, tx_id: &TransactionId) -> Result<Transaction> {
        self.write_as(token, |db, me, now| {
            let tx = db.transactions.start(&me.user_id, tx_id, now)?;
            db.requests.mark_in_progress(&tx.request_id, now)?;
            db.notify(
                &tx.requester,
                NotificationKind::WorkStarted,
                format!("{} started work", db.name_of(&tx.provider)),
                &tx.id,
                now,
            );
            Ok(tx)
        })
    }

    /// Records the caller's confirmation that the work is done.
    ///
    /// The second confirmation completes the transaction: credits move from
    /// requester to provider and the request completes. If the requester
    /// cannot afford the settlement nothing changes.
    ///
    /// # Errors
    ///
    /// Fails for outsiders, a transaction that is not `pending` or
    /// `in_progress`, or `InsufficientCredits` on settlement.
    pub fn confirm_completion(&self, token: &str, tx_id: &TransactionId) -> Result<Transaction> {
        self.write_as(token, |db, me, now| {
            let tx = db.transactions.require(tx_id)?.clone();
            let party = tx.require_party(&me.user_id)?;
            let already = tx.is_confirmed_by(party);
            let completes = tx.completes_on_confirm(party)?;
            if completes {
                db.settle(&tx, now)?;
            }
            let updated = db.transactions.confirm(&me.user_id, tx_id, now)?;

            if completes {
                db.finish_completion(&updated, now)?;
            } else if already {
                debug!(transaction_id = %tx_id, "confirmation already recorded");
            } else {
                let other = updated.user(party.other()).clone();
                db.notify(
                    &other,
                    NotificationKind::CompletionConfirmed,
                    format!("{} confirmed completion", db.name_of(&me.user_id)),
                    &updated.id,
                    now,
                );
            }
            Ok(updated)
        })
    }

    /// Either party calls off a pending transaction. The request is
    /// cancelled with it.
    ///
    /// # Errors
    ///
    /// Fails for outsiders or unless the transaction is `pending`.
    pub fn cancel_transaction(&self, token: &str, tx_id: &TransactionId) -> Result<Transaction> {
        self.write_as(token, |db, me, now| {
            let tx = db.transactions.cancel(&me.user_id, tx_id)?;
            db.requests.mark_cancelled(&tx.request_id, now)?;
            let party = tx.require_party(&me.user_id)?;
            db.notify(
                tx.user(party.other()),
                NotificationKind::TransactionCancelled,
                format!("{} cancelled the transaction", db.name_of(&me.user_id)),
                &tx.id,
                now,
            );
            Ok(tx)
        })
    }

    /// Either party raises a dispute on an open transaction.
    ///
    /// # Errors
    ///
    /// Fails for outsiders, a blank reason, or a transaction that is not
    /// `pending` or `in_progress`.
    pub fn dispute_transaction(
        &self,
        token: &str,
        tx_id: &TransactionId,
        reason: &str,
        evidence: Vec<AttachmentId>,
    ) -> Result<Transaction> {
        self.write_as(token, |db, me, now| {
            let tx = db.transactions.dispute(&me.user_id, tx_id, reason, evidence, now)?;
            let party = tx.require_party(&me.user_id)?;
            db.notify(
                tx.user(party.other()),
                NotificationKind::TransactionDisputed,
                format!("{} disputed the transaction", db.name_of(&me.user_id)),
                &tx.id,
                now,
            );
            Ok(tx)
        })
    }
}

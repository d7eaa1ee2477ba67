//! Administrator operations.

use serde::{Deserialize, Serialize};
use swap_auth::{Role, UserProfile, UserStatus};
use swap_core::{TransactionId, UserId};
use swap_ledger::{CreditEntry, Discrepancy};
use swap_market::{NotificationKind, Resolution, Transaction};
use tracing::{info, warn};

use crate::account::AuthSession;
use crate::error::{Result, ServiceError};
use crate::facade::SkillSwap;

/// Outcome of a housekeeping sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Expired sessions deleted.
    pub sessions_purged: usize,
    /// Stale proposals marked expired.
    pub negotiations_expired: usize,
}

impl SkillSwap {
    /// Creates the first administrator account. Refused once any admin
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if an admin already exists, or the usual
    /// registration errors.
    pub fn bootstrap_admin(&self, email: &str, display_name: &str, password: &str) -> Result<AuthSession> {
        let has_admin = self.read(|db, _| Ok(db.users.iter().any(|u| u.role.is_admin())))?;
        if has_admin {
            return Err(ServiceError::forbidden("an administrator already exists"));
        }
        let session = self.create_account(email, display_name, password, Role::Admin)?;
        info!(user_id = %session.user.id, "bootstrapped administrator");
        Ok(session)
    }

    /// Every account, oldest first.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn list_users(&self, token: &str) -> Result<Vec<UserProfile>> {
        self.read_as(token, |db, me, _| {
            me.require_admin()?;
            let mut users: Vec<_> = db.users.iter().map(swap_auth::User::profile).collect();
            users.sort_by_key(|u| u.created_at);
            Ok(users)
        })
    }

    /// Suspends an account and revokes its sessions.
    ///
    /// # Errors
    ///
    /// Requires an admin session; admins cannot suspend themselves.
    pub fn suspend_user(&self, token: &str, user_id: &UserId) -> Result<UserProfile> {
        self.write_as_admin(token, |db, me, _| {
            if &me.user_id == user_id {
                return Err(ServiceError::forbidden("cannot suspend yourself"));
            }
            db.users.set_status(user_id, UserStatus::Suspended)?;
            let revoked = db.sessions.revoke_all_for_user(user_id);
            info!(user_id = %user_id, revoked, "suspended user");
            Ok(db.users.require(user_id)?.profile())
        })
    }

    /// Lifts a suspension.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn reactivate_user(&self, token: &str, user_id: &UserId) -> Result<UserProfile> {
        self.write_as_admin(token, |db, _, _| {
            db.users.set_status(user_id, UserStatus::Active)?;
            Ok(db.users.require(user_id)?.profile())
        })
    }

    /// Grants the admin role.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn promote_to_admin(&self, token: &str, user_id: &UserId) -> Result<UserProfile> {
        self.write_as_admin(token, |db, _, _| {
            db.users.set_role(user_id, Role::Admin)?;
            Ok(db.users.require(user_id)?.profile())
        })
    }

    /// Posts a signed adjustment to a user's balance. Balances may go
    /// negative.
    ///
    /// # Errors
    ///
    /// Requires an admin session; fails for a zero amount or unknown user.
    pub fn adjust_credits(&self, token: &str, user_id: &UserId, amount: i64, reason: &str) -> Result<CreditEntry> {
        self.write_as_admin(token, |db, me, now| {
            db.users.require(user_id)?;
            let entry = db.adjust(user_id, amount, reason, now)?;
            info!(user_id = %user_id, amount, admin = %me.user_id, "adjusted credits");
            db.notify(
                user_id,
                NotificationKind::CreditsAdjusted,
                format!("Your balance was adjusted by {amount:+}: {reason}"),
                &entry.id,
                now,
            );
            Ok(entry)
        })
    }

    /// Disputed transactions, oldest first.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn disputed_transactions(&self, token: &str) -> Result<Vec<Transaction>> {
        self.read_as(token, |db, me, _| {
            me.require_admin()?;
            Ok(db.transactions.disputed().into_iter().cloned().collect())
        })
    }

    /// Settles a dispute. `Complete` moves credits as a normal completion
    /// would; `Cancel` calls the exchange off and cancels the request.
    ///
    /// # Errors
    ///
    /// Requires an admin session; fails unless the transaction is
    /// `disputed`, or with `InsufficientCredits` when completing.
    pub fn resolve_dispute(&self, token: &str, tx_id: &TransactionId, resolution: Resolution) -> Result<Transaction> {
        self.write_as_admin(token, |db, _, now| {
            let tx = db.transactions.require(tx_id)?.clone();
            let resolved = match resolution {
                Resolution::Complete => {
                    db.settle(&tx, now)?;
                    let resolved = db.transactions.resolve(tx_id, resolution, now)?;
                    db.finish_completion(&resolved, now)?;
                    resolved
                }
                Resolution::Cancel => {
                    let resolved = db.transactions.resolve(tx_id, resolution, now)?;
                    db.requests.mark_cancelled(&resolved.request_id, now)?;
                    resolved
                }
            };
            for party in [&resolved.requester, &resolved.provider] {
                db.notify(
                    party,
                    NotificationKind::DisputeResolved,
                    format!("Dispute resolved: {resolution}"),
                    &resolved.id,
                    now,
                );
            }
            Ok(resolved)
        })
    }

    /// Undoes a completed or disputed transaction, returning any settled
    /// credits to the requester.
    ///
    /// # Errors
    ///
    /// Requires an admin session; fails unless the transaction is
    /// `completed` or `disputed`.
    pub fn reverse_transaction(&self, token: &str, tx_id: &TransactionId) -> Result<Transaction> {
        self.write_as_admin(token, |db, _, now| {
            db.refund(tx_id, now)?;
            let reversed = db.transactions.reverse(tx_id)?;
            for party in [&reversed.requester, &reversed.provider] {
                db.notify(
                    party,
                    NotificationKind::TransactionReversed,
                    "Transaction reversed by an administrator",
                    &reversed.id,
                    now,
                );
            }
            Ok(reversed)
        })
    }

    /// Compares every cached balance with the ledger and repairs the ones
    /// that drifted. Returns what was found.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn reconcile_balances(&self, token: &str) -> Result<Vec<Discrepancy>> {
        self.write_as_admin(token, |db, _, _| {
            let found = db
                .ledger
                .reconcile(db.users.iter().map(|u| (&u.id, u.credits)));
            for d in &found {
                warn!(user_id = %d.user_id, cached = d.cached, ledger = d.ledger, "repaired cached balance");
                db.users.set_credits(&d.user_id, d.ledger)?;
            }
            Ok(found)
        })
    }

    /// Deletes expired sessions and expires stale proposals.
    ///
    /// # Errors
    ///
    /// Requires an admin session.
    pub fn admin_sweep(&self, token: &str) -> Result<SweepReport> {
        self.write_as_admin(token, |db, _, now| {
            let report = SweepReport {
                sessions_purged: db.sessions.purge_expired(now),
                negotiations_expired: db.negotiations.expire_stale(now),
            };
            info!(
                sessions_purged = report.sessions_purged,
                negotiations_expired = report.negotiations_expired,
                "sweep finished"
            );
            Ok(report)
        })
    }
}

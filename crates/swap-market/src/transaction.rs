//! Binding exchanges between a requester and a provider.
//!
//! A transaction completes only when both parties have confirmed. A dispute
//! freezes party-driven changes until an administrator resolves it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use swap_core::{AttachmentId, Credits, MatchId, RequestId, TransactionId, UserId};
use tracing::info;

use crate::error::{MarketError, Result};
use crate::matching::{MatchStatus, SuggestedMatch};
use crate::request::{ExchangeTerms, RequestStatus, ServiceRequest};

/// The state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, work not started.
    Pending,
    /// The provider started work.
    InProgress,
    /// Both parties confirmed.
    Completed,
    /// A party raised a dispute.
    Disputed,
    /// Called off before completion.
    Cancelled,
    /// Undone by an administrator.
    Reversed,
}

impl TransactionStatus {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        use TransactionStatus::{Cancelled, Completed, Disputed, InProgress, Pending, Reversed};

        matches!(
            (self, target),
            (Pending, InProgress | Completed | Disputed | Cancelled)
                | (InProgress, Completed | Disputed)
                | (Disputed, Completed | Cancelled | Reversed)
                | (Completed, Reversed)
        )
    }

    /// Returns true if the parties can still confirm.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Disputed => write!(f, "disputed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Reversed => write!(f, "reversed"),
        }
    }
}

/// A side of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The user who asked for the service.
    Requester,
    /// The user performing the service.
    Provider,
}

impl Party {
    /// The other side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Requester => Self::Provider,
            Self::Provider => Self::Requester,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requester => write!(f, "requester"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

/// Details of a raised dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Who raised it.
    pub raised_by: UserId,
    /// Stated reason.
    pub reason: String,
    /// Supporting attachments.
    pub evidence: Vec<AttachmentId>,
    /// When it was raised.
    pub raised_at: DateTime<Utc>,
}

/// How an administrator settles a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Treat the work as done and settle.
    Complete,
    /// Call the exchange off.
    Cancel,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

impl FromStr for Resolution {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "cancel" => Ok(Self::Cancel),
            other => Err(MarketError::InvalidStateTransition {
                from: TransactionStatus::Disputed.to_string(),
                to: other.to_string(),
            }),
        }
    }
}

/// A binding exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: TransactionId,
    /// The match it was created from.
    pub match_id: MatchId,
    /// The request it serves.
    pub request_id: RequestId,
    /// The paying side.
    pub requester: UserId,
    /// The performing side.
    pub provider: UserId,
    /// Agreed terms.
    pub terms: ExchangeTerms,
    /// Requester confirmed completion.
    pub requester_confirmed: bool,
    /// Provider confirmed completion.
    pub provider_confirmed: bool,
    /// Current status.
    pub status: TransactionStatus,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When work started.
    pub started_at: Option<DateTime<Utc>>,
    /// When it completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Dispute details, if one was raised.
    pub dispute: Option<Dispute>,
    /// Administrator resolution of the dispute.
    pub resolution: Option<Resolution>,
    /// Credits moved through the ledger.
    pub credits_settled: bool,
}

impl Transaction {
    /// The side `user` is on, if any.
    #[must_use]
    pub fn party_of(&self, user: &UserId) -> Option<Party> {
        if user == &self.requester {
            Some(Party::Requester)
        } else if user == &self.provider {
            Some(Party::Provider)
        } else {
            None
        }
    }

    /// The side `user` is on.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotAuthorized`] for outsiders.
    pub fn require_party(&self, user: &UserId) -> Result<Party> {
        self.party_of(user).ok_or_else(|| {
            MarketError::not_authorized(format!("not a party to transaction {}", self.id))
        })
    }

    /// The user on a given side.
    #[must_use]
    pub const fn user(&self, party: Party) -> &UserId {
        match party {
            Party::Requester => &self.requester,
            Party::Provider => &self.provider,
        }
    }

    /// Whether a side has confirmed.
    #[must_use]
    pub const fn is_confirmed_by(&self, party: Party) -> bool {
        match party {
            Party::Requester => self.requester_confirmed,
            Party::Provider => self.provider_confirmed,
        }
    }

    /// Both sides have confirmed.
    #[must_use]
    pub const fn is_fully_confirmed(&self) -> bool {
        self.requester_confirmed && self.provider_confirmed
    }

    /// Credits that move on completion.
    #[must_use]
    pub fn settlement_amount(&self) -> Option<Credits> {
        self.terms.settlement_amount()
    }

    /// Whether a confirmation by `party` would complete the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidStateTransition`] unless the
    /// transaction is `pending` or `in_progress`.
    pub fn completes_on_confirm(&self, party: Party) -> Result<bool> {
        if !self.status.is_open() {
            return Err(MarketError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TransactionStatus::Completed.to_string(),
            });
        }
        Ok(self.is_confirmed_by(party.other()))
    }

    fn transition_to(&mut self, target: TransactionStatus) -> Result<()> {
        if self.status.can_transition_to(target) {
            self.status = target;
            Ok(())
        } else {
            Err(MarketError::InvalidStateTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition_to(TransactionStatus::Completed)?;
        self.requester_confirmed = true;
        self.provider_confirmed = true;
        self.completed_at = Some(now);
        Ok(())
    }
}

/// Every transaction.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TransactionBook {
    transactions: HashMap<TransactionId, Transaction>,
}

impl TransactionBook {
    /// Creates a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pending transaction from an accepted match.
    ///
    /// The caller links the match afterwards.
    ///
    /// # Errors
    ///
    /// Fails unless the match is `accepted`, belongs to a `matched`
    /// `request`, and has no transaction yet.
    pub fn open(
        &mut self,
        suggestion: &SuggestedMatch,
        request: &ServiceRequest,
        terms: ExchangeTerms,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        if suggestion.request_id != request.id {
            return Err(MarketError::not_found("match", &suggestion.id));
        }
        if request.status != RequestStatus::Matched {
            return Err(MarketError::InvalidStateTransition {
                from: format!("request {}", request.status),
                to: "transaction".to_string(),
            });
        }
        if suggestion.status != MatchStatus::Accepted {
            return Err(MarketError::InvalidStateTransition {
                from: suggestion.status.to_string(),
                to: "transaction".to_string(),
            });
        }
        if let Some(existing) = &suggestion.transaction_id {
            return Err(MarketError::AlreadyLinked {
                match_id: suggestion.id.to_string(),
                transaction_id: existing.to_string(),
            });
        }

        let tx = Transaction {
            id: TransactionId::new(),
            match_id: suggestion.id.clone(),
            request_id: request.id.clone(),
            requester: request.requester.clone(),
            provider: suggestion.provider_id.clone(),
            terms,
            requester_confirmed: false,
            provider_confirmed: false,
            status: TransactionStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            dispute: None,
            resolution: None,
            credits_settled: false,
        };
        self.transactions.insert(tx.id.clone(), tx.clone());
        info!(
            transaction_id = %tx.id,
            requester = %tx.requester,
            provider = %tx.provider,
            mode = %tx.terms.mode,
            "created transaction"
        );
        Ok(tx)
    }

    /// Gets a transaction by ID.
    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    /// Gets a transaction, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if absent.
    pub fn require(&self, id: &TransactionId) -> Result<&Transaction> {
        self.transactions
            .get(id)
            .ok_or_else(|| MarketError::not_found("transaction", id))
    }

    fn require_mut(&mut self, id: &TransactionId) -> Result<&mut Transaction> {
        self.transactions
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("transaction", id))
    }

    /// The provider starts work.
    ///
    /// # Errors
    ///
    /// Fails unless the actor is the provider and the transaction is `pending`.
    pub fn start(&mut self, actor: &UserId, id: &TransactionId, now: DateTime<Utc>) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        if actor != &tx.provider {
            return Err(MarketError::not_authorized("only the provider can start work"));
        }
        if tx.status != TransactionStatus::Pending {
            return Err(MarketError::InvalidStateTransition {
                from: tx.status.to_string(),
                to: TransactionStatus::InProgress.to_string(),
            });
        }
        tx.transition_to(TransactionStatus::InProgress)?;
        tx.started_at = Some(now);
        info!(transaction_id = %id, "started work");
        Ok(tx.clone())
    }

    /// Records a party's confirmation. Completes the transaction once both
    /// sides have confirmed. Confirming twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails for outsiders or unless the transaction is `pending` or
    /// `in_progress`.
    pub fn confirm(&mut self, actor: &UserId, id: &TransactionId, now: DateTime<Utc>) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        let party = tx.require_party(actor)?;
        tx.completes_on_confirm(party)?;
        match party {
            Party::Requester => tx.requester_confirmed = true,
            Party::Provider => tx.provider_confirmed = true,
        }
        if tx.is_fully_confirmed() {
            tx.complete(now)?;
            info!(transaction_id = %id, "transaction completed");
        } else {
            info!(transaction_id = %id, %party, "confirmation recorded");
        }
        Ok(tx.clone())
    }

    /// A party calls off a pending transaction.
    ///
    /// # Errors
    ///
    /// Fails for outsiders or unless the transaction is `pending`.
    pub fn cancel(&mut self, actor: &UserId, id: &TransactionId) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        tx.require_party(actor)?;
        if tx.status != TransactionStatus::Pending {
            return Err(MarketError::InvalidStateTransition {
                from: tx.status.to_string(),
                to: TransactionStatus::Cancelled.to_string(),
            });
        }
        tx.transition_to(TransactionStatus::Cancelled)?;
        info!(transaction_id = %id, actor = %actor, "cancelled transaction");
        Ok(tx.clone())
    }

    /// A party raises a dispute.
    ///
    /// # Errors
    ///
    /// Fails for outsiders, a blank reason, or unless the transaction is
    /// `pending` or `in_progress`.
    pub fn dispute(
        &mut self,
        actor: &UserId,
        id: &TransactionId,
        reason: &str,
        evidence: Vec<AttachmentId>,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        tx.require_party(actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(MarketError::InvalidRequest {
                reason: "a dispute needs a reason".to_string(),
            });
        }
        if !tx.status.is_open() {
            return Err(MarketError::InvalidStateTransition {
                from: tx.status.to_string(),
                to: TransactionStatus::Disputed.to_string(),
            });
        }
        tx.transition_to(TransactionStatus::Disputed)?;
        tx.dispute = Some(Dispute {
            raised_by: actor.clone(),
            reason: reason.to_string(),
            evidence,
            raised_at: now,
        });
        info!(transaction_id = %id, raised_by = %actor, "transaction disputed");
        Ok(tx.clone())
    }

    /// Settles a dispute.
    ///
    /// # Errors
    ///
    /// Fails unless the transaction is `disputed`.
    pub fn resolve(&mut self, id: &TransactionId, resolution: Resolution, now: DateTime<Utc>) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        if tx.status != TransactionStatus::Disputed {
            return Err(MarketError::InvalidStateTransition {
                from: tx.status.to_string(),
                to: resolution.to_string(),
            });
        }
        match resolution {
            Resolution::Complete => tx.complete(now)?,
            Resolution::Cancel => tx.transition_to(TransactionStatus::Cancelled)?,
        }
        tx.resolution = Some(resolution);
        info!(transaction_id = %id, %resolution, "dispute resolved");
        Ok(tx.clone())
    }

    /// Undoes a completed or disputed transaction.
    ///
    /// # Errors
    ///
    /// Fails unless the transaction is `completed` or `disputed`.
    pub fn reverse(&mut self, id: &TransactionId) -> Result<Transaction> {
        let tx = self.require_mut(id)?;
        tx.transition_to(TransactionStatus::Reversed)?;
        info!(transaction_id = %id, "transaction reversed");
        Ok(tx.clone())
    }

    /// Records whether credits have moved for this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if absent.
    pub fn set_settled(&mut self, id: &TransactionId, settled: bool) -> Result<()> {
        self.require_mut(id)?.credits_settled = settled;
        Ok(())
    }

    /// Transactions a user is party to, newest first.
    #[must_use]
    pub fn for_user(&self, user: &UserId) -> Vec<&Transaction> {
        let mut found: Vec<_> = self
            .transactions
            .values()
            .filter(|t| t.party_of(user).is_some())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Every disputed transaction, oldest first.
    #[must_use]
    pub fn disputed(&self) -> Vec<&Transaction> {
        let mut found: Vec<_> = self
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Disputed)
            .collect();
        found.sort_by_key(|t| t.created_at);
        found
    }
}

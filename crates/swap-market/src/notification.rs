//! Per-user notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use swap_core::{NotificationId, UserId};
use tracing::debug;

use crate::error::{MarketError, Result};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// You were suggested for a request.
    MatchSuggested,
    /// A requester accepted your match.
    MatchAccepted,
    /// The other party proposed new terms.
    TermsProposed,
    /// Your proposal was answered.
    NegotiationAnswered,
    /// A transaction was created.
    TransactionCreated,
    /// The provider started work.
    WorkStarted,
    /// The other party confirmed completion.
    CompletionConfirmed,
    /// Both parties confirmed; credits settled.
    TransactionCompleted,
    /// The other party cancelled.
    TransactionCancelled,
    /// A dispute was raised.
    TransactionDisputed,
    /// An administrator resolved a dispute.
    DisputeResolved,
    /// An administrator reversed a transaction.
    TransactionReversed,
    /// You received a rating.
    RatingReceived,
    /// An administrator changed your balance.
    CreditsAdjusted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MatchSuggested => "match_suggested",
            Self::MatchAccepted => "match_accepted",
            Self::TermsProposed => "terms_proposed",
            Self::NegotiationAnswered => "negotiation_answered",
            Self::TransactionCreated => "transaction_created",
            Self::WorkStarted => "work_started",
            Self::CompletionConfirmed => "completion_confirmed",
            Self::TransactionCompleted => "transaction_completed",
            Self::TransactionCancelled => "transaction_cancelled",
            Self::TransactionDisputed => "transaction_disputed",
            Self::DisputeResolved => "dispute_resolved",
            Self::TransactionReversed => "transaction_reversed",
            Self::RatingReceived => "rating_received",
            Self::CreditsAdjusted => "credits_adjusted",
        };
        f.write_str(name)
    }
}

/// A message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// What happened.
    pub kind: NotificationKind,
    /// Human-readable text.
    pub message: String,
    /// ID of the record it refers to.
    pub related_id: Option<String>,
    /// Whether the recipient has seen it.
    pub read: bool,
    /// When it was sent.
    pub created_at: DateTime<Utc>,
}

/// Every notification, in delivery order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Inbox {
    notifications: Vec<Notification>,
}

impl Inbox {
    /// Creates a new empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a notification.
    pub fn notify(
        &mut self,
        user_id: &UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        related_id: Option<&dyn fmt::Display>,
        now: DateTime<Utc>,
    ) -> NotificationId {
        let notification = Notification {
            id: NotificationId::new(),
            user_id: user_id.clone(),
            kind,
            message: message.into(),
            related_id: related_id.map(ToString::to_string),
            read: false,
            created_at: now,
        };
        debug!(user_id = %user_id, %kind, "delivered notification");
        let id = notification.id.clone();
        self.notifications.push(notification);
        id
    }

    /// A user's notifications, newest first.
    #[must_use]
    pub fn list(&self, user_id: &UserId, unread_only: bool) -> Vec<&Notification> {
        self.notifications
            .iter()
            .rev()
            .filter(|n| &n.user_id == user_id && (!unread_only || !n.read))
            .collect()
    }

    /// Unread notifications for a user.
    #[must_use]
    pub fn unread_count(&self, user_id: &UserId) -> usize {
        self.notifications
            .iter()
            .filter(|n| &n.user_id == user_id && !n.read)
            .count()
    }

    /// Marks one notification read.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if it does not exist or belongs to
    /// another user.
    pub fn mark_read(&mut self, user_id: &UserId, id: &NotificationId) -> Result<()> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| &n.id == id && &n.user_id == user_id)
            .ok_or_else(|| MarketError::not_found("notification", id))?;
        notification.read = true;
        Ok(())
    }

    /// Marks every notification for a user read. Returns how many changed.
    pub fn mark_all_read(&mut self, user_id: &UserId) -> usize {
        let mut count = 0;
        for n in self
            .notifications
            .iter_mut()
            .filter(|n| &n.user_id == user_id && !n.read)
        {
            n.read = true;
            count += 1;
        }
        count
    }
}

//! Counter-proposals on accepted matches.
//!
//! Either party to an accepted match may propose new terms until a
//! transaction exists. Only one proposal per match is pending at a time; a
//! new one expires its predecessor. Only the counterparty may answer, and an
//! answer after the expiry is refused.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use swap_core::{MatchId, NegotiationId, UserId};
use tracing::info;

use crate::error::{MarketError, Result};
use crate::matching::{MatchStatus, SuggestedMatch};
use crate::request::{ExchangeTerms, RequestStatus, ServiceRequest};
use crate::skill::SkillCatalog;

/// Default lifetime of a proposal.
pub const DEFAULT_NEGOTIATION_TTL_HOURS: i64 = 72;

/// Lifecycle of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    /// Awaiting the counterparty.
    Pending,
    /// Agreed; a transaction was created on these terms.
    Accepted,
    /// Declined by the counterparty.
    Rejected,
    /// Timed out or superseded.
    Expired,
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A proposal of new terms for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    /// Negotiation identifier.
    pub id: NegotiationId,
    /// The match being negotiated.
    pub match_id: MatchId,
    /// Who proposed.
    pub proposer: UserId,
    /// Who must answer.
    pub counterparty: UserId,
    /// Proposed terms.
    pub terms: ExchangeTerms,
    /// Current status.
    pub status: NegotiationStatus,
    /// When the proposal was made.
    pub created_at: DateTime<Utc>,
    /// When the proposal lapses.
    pub expires_at: DateTime<Utc>,
    /// When it was answered or expired.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Negotiation {
    /// Returns true once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn close(&mut self, status: NegotiationStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status != NegotiationStatus::Pending {
            return Err(MarketError::InvalidStateTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.closed_at = Some(now);
        Ok(())
    }
}

/// Result of a new proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The new pending negotiation.
    pub negotiation: Negotiation,
    /// Earlier pending proposals it superseded.
    pub superseded: Vec<NegotiationId>,
}

/// Every negotiation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NegotiationBook {
    negotiations: HashMap<NegotiationId, Negotiation>,
}

impl NegotiationBook {
    /// Creates a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Proposes new terms on an accepted match.
    ///
    /// # Errors
    ///
    /// Fails if the match is not `accepted`, already has a transaction, the
    /// actor is not a party, or the terms are invalid for the requester.
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &mut self,
        actor: &UserId,
        suggestion: &SuggestedMatch,
        request: &ServiceRequest,
        terms: ExchangeTerms,
        catalog: &SkillCatalog,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Proposal> {
        if request.status != RequestStatus::Matched {
            return Err(MarketError::InvalidStateTransition {
                from: format!("request {}", request.status),
                to: "negotiating".to_string(),
            });
        }
        if suggestion.status != MatchStatus::Accepted {
            return Err(MarketError::InvalidStateTransition {
                from: suggestion.status.to_string(),
                to: "negotiating".to_string(),
            });
        }
        if let Some(tx) = &suggestion.transaction_id {
            return Err(MarketError::AlreadyLinked {
                match_id: suggestion.id.to_string(),
                transaction_id: tx.to_string(),
            });
        }
        let counterparty = if actor == &request.requester {
            suggestion.provider_id.clone()
        } else if actor == &suggestion.provider_id {
            request.requester.clone()
        } else {
            return Err(MarketError::not_authorized("only the matched parties can negotiate"));
        };
        terms.validate(&request.requester, catalog)?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| MarketError::invalid_terms("proposal lifetime out of range"))?;

        let mut superseded = Vec::new();
        for earlier in self.negotiations.values_mut() {
            if earlier.match_id == suggestion.id && earlier.status == NegotiationStatus::Pending {
                earlier.close(NegotiationStatus::Expired, now)?;
                superseded.push(earlier.id.clone());
            }
        }

        let negotiation = Negotiation {
            id: NegotiationId::new(),
            match_id: suggestion.id.clone(),
            proposer: actor.clone(),
            counterparty,
            terms,
            status: NegotiationStatus::Pending,
            created_at: now,
            expires_at,
            closed_at: None,
        };
        self.negotiations
            .insert(negotiation.id.clone(), negotiation.clone());
        info!(
            negotiation_id = %negotiation.id,
            match_id = %suggestion.id,
            proposer = %actor,
            superseded = superseded.len(),
            "proposed terms"
        );
        Ok(Proposal {
            negotiation,
            superseded,
        })
    }

    /// Answers a pending proposal.
    ///
    /// A proposal past its expiry is marked `expired` and the answer refused,
    /// as is an answer to a proposal that was superseded.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotAuthorized`] unless the actor is the
    /// counterparty, [`MarketError::NegotiationExpired`] after the expiry, and
    /// [`MarketError::InvalidStateTransition`] if already closed.
    pub fn respond(
        &mut self,
        actor: &UserId,
        id: &NegotiationId,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<Negotiation> {
        let negotiation = self
            .negotiations
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("negotiation", id))?;
        if actor != &negotiation.counterparty {
            return Err(MarketError::not_authorized(
                "only the counterparty can answer a proposal",
            ));
        }
        if negotiation.status == NegotiationStatus::Pending && negotiation.is_expired_at(now) {
            negotiation.close(NegotiationStatus::Expired, now)?;
        }
        if negotiation.status == NegotiationStatus::Expired {
            return Err(MarketError::NegotiationExpired { id: id.to_string() });
        }
        let status = if accept {
            NegotiationStatus::Accepted
        } else {
            NegotiationStatus::Rejected
        };
        negotiation.close(status, now)?;
        info!(negotiation_id = %id, %status, "answered proposal");
        Ok(negotiation.clone())
    }

    /// Marks every pending proposal past its expiry as `expired`. Returns how
    /// many changed.
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> usize {
        let mut count = 0;
        for n in self.negotiations.values_mut() {
            if n.status == NegotiationStatus::Pending && n.is_expired_at(now) {
                n.status = NegotiationStatus::Expired;
                n.closed_at = Some(now);
                count += 1;
            }
        }
        if count > 0 {
            info!(count, "expired stale proposals");
        }
        count
    }

    /// Gets a negotiation by ID.
    #[must_use]
    pub fn get(&self, id: &NegotiationId) -> Option<&Negotiation> {
        self.negotiations.get(id)
    }

    /// Gets a negotiation, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if absent.
    pub fn require(&self, id: &NegotiationId) -> Result<&Negotiation> {
        self.negotiations
            .get(id)
            .ok_or_else(|| MarketError::not_found("negotiation", id))
    }

    /// Proposals on a match, oldest first.
    #[must_use]
    pub fn for_match(&self, match_id: &MatchId) -> Vec<&Negotiation> {
        let mut found: Vec<_> = self
            .negotiations
            .values()
            .filter(|n| &n.match_id == match_id)
            .collect();
        found.sort_by_key(|n| n.created_at);
        found
    }
}

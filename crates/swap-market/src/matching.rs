//! Provider suggestions for service requests.
//!
//! A suggestion is scored out of 100:
//!
//! | component | points |
//! |---|---|
//! | skill level | beginner 20, intermediate 35, expert 50 |
//! | provider reputation | average × 8, capped at 40; 20 when unrated |
//! | affordability | 10 when the hourly rate × hours fits the credits offered |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use swap_core::{MatchId, RequestId, SkillId, TransactionId, UserId};
use tracing::{debug, info};

use crate::error::{MarketError, Result};
use crate::request::{ExchangeMode, RequestStatus, ServiceRequest};
use crate::skill::Skill;

/// Reputation points granted to providers nobody has rated yet.
const UNRATED_BONUS: u8 = 20;
/// Cap on reputation points.
const MAX_REPUTATION_BONUS: f64 = 40.0;
/// Points for a provider whose rate fits the offer.
const AFFORDABILITY_BONUS: u8 = 10;

/// Scores one provider skill against a request.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn match_score(request: &ServiceRequest, skill: &Skill, provider_reputation: Option<f64>) -> u8 {
    let reputation = provider_reputation.map_or(UNRATED_BONUS, |avg| {
        (avg * 8.0).round().clamp(0.0, MAX_REPUTATION_BONUS) as u8
    });

    let affordable = request.terms.mode == ExchangeMode::Credits
        && request.terms.credits.is_some_and(|offer| {
            skill
                .hourly_rate
                .checked_mul(u64::from(request.terms.estimated_hours()))
                .is_some_and(|cost| cost <= offer)
        });

    let score = skill.level.weight() + reputation + if affordable { AFFORDABILITY_BONUS } else { 0 };
    score.min(100)
}

/// Lifecycle of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Awaiting the requester's decision.
    Pending,
    /// Chosen by the requester.
    Accepted,
    /// Declined, or superseded by another accepted match.
    Rejected,
}

impl MatchStatus {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Accepted | Self::Rejected)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A system-proposed pairing between a request and a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedMatch {
    /// Match identifier.
    pub id: MatchId,
    /// The request being served.
    pub request_id: RequestId,
    /// The candidate provider.
    pub provider_id: UserId,
    /// The provider skill that scored best.
    pub skill_id: SkillId,
    /// Score out of 100.
    pub score: u8,
    /// Current status.
    pub status: MatchStatus,
    /// The transaction created from this match, if any.
    pub transaction_id: Option<TransactionId>,
    /// When the match was suggested.
    pub created_at: DateTime<Utc>,
}

impl SuggestedMatch {
    fn transition_to(&mut self, target: MatchStatus) -> Result<()> {
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
}

/// Result of accepting a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMatch {
    /// The accepted match.
    pub accepted: SuggestedMatch,
    /// Sibling matches that were rejected as a consequence.
    pub rejected: Vec<SuggestedMatch>,
}

/// Every suggested match.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MatchBook {
    matches: HashMap<MatchId, SuggestedMatch>,
}

impl MatchBook {
    /// Creates a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores candidate skills and records up to `limit` new suggestions.
    ///
    /// Each candidate is a skill plus its owner's provider reputation. Skills
    /// outside the request's category and the requester's own skills are
    /// ignored. Only the best-scoring skill per provider counts, and providers
    /// already holding a pending or accepted match for the request are
    /// skipped. Returns the new matches, best first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidStateTransition`] unless the request is
    /// `open`.
    pub fn suggest<'a, I>(
        &mut self,
        request: &ServiceRequest,
        candidates: I,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<SuggestedMatch>>
    where
        I: IntoIterator<Item = (&'a Skill, Option<f64>)>,
    {
        if request.status != RequestStatus::Open {
            return Err(MarketError::InvalidStateTransition {
                from: request.status.to_string(),
                to: "matching".to_string(),
            });
        }

        let mut best: HashMap<&UserId, (u8, &Skill)> = HashMap::new();
        for (skill, reputation) in candidates {
            if skill.category != request.category || skill.owner == request.requester {
                continue;
            }
            if self.has_live_match(&request.id, &skill.owner) {
                continue;
            }
            let score = match_score(request, skill, reputation);
            let entry = best.entry(&skill.owner).or_insert((score, skill));
            if (score, Reverse(skill.hourly_rate)) > (entry.0, Reverse(entry.1.hourly_rate)) {
                *entry = (score, skill);
            }
        }

        let mut ranked: Vec<_> = best.into_iter().collect();
        ranked.sort_by(|(a_user, (a_score, _)), (b_user, (b_score, _))| {
            b_score.cmp(a_score).then_with(|| a_user.cmp(b_user))
        });

        let mut created = Vec::new();
        for (provider, (score, skill)) in ranked.into_iter().take(limit) {
            let suggestion = SuggestedMatch {
                id: MatchId::new(),
                request_id: request.id.clone(),
                provider_id: provider.clone(),
                skill_id: skill.id.clone(),
                score,
                status: MatchStatus::Pending,
                transaction_id: None,
                created_at: now,
            };
            debug!(match_id = %suggestion.id, provider = %provider, score, "suggested match");
            self.matches.insert(suggestion.id.clone(), suggestion.clone());
            created.push(suggestion);
        }
        info!(request_id = %request.id, count = created.len(), "suggested matches");
        Ok(created)
    }

    fn has_live_match(&self, request_id: &RequestId, provider: &UserId) -> bool {
        self.matches.values().any(|m| {
            &m.request_id == request_id
                && &m.provider_id == provider
                && matches!(m.status, MatchStatus::Pending | MatchStatus::Accepted)
        })
    }

    fn require_for_request(&mut self, request: &ServiceRequest, id: &MatchId) -> Result<&mut SuggestedMatch> {
        let found = self
            .matches
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("match", id))?;
        if found.request_id != request.id {
            return Err(MarketError::not_found("match", id));
        }
        Ok(found)
    }

    /// Accepts a pending match. Only the requester may decide, and only while
    /// the request is `open`. Every other pending match for the request is
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotAuthorized`] or
    /// [`MarketError::InvalidStateTransition`].
    pub fn accept(
        &mut self,
        actor: &UserId,
        request: &ServiceRequest,
        id: &MatchId,
    ) -> Result<AcceptedMatch> {
        if actor != &request.requester {
            return Err(MarketError::not_authorized("only the requester can accept a match"));
        }
        if request.status != RequestStatus::Open {
            return Err(MarketError::InvalidStateTransition {
                from: request.status.to_string(),
                to: RequestStatus::Matched.to_string(),
            });
        }
        let chosen = self.require_for_request(request, id)?;
        chosen.transition_to(MatchStatus::Accepted)?;
        let accepted = chosen.clone();

        let mut rejected = Vec::new();
        for other in self.matches.values_mut() {
            if other.request_id == request.id && other.status == MatchStatus::Pending {
                other.status = MatchStatus::Rejected;
                rejected.push(other.clone());
            }
        }
        info!(
            match_id = %id,
            request_id = %request.id,
            provider = %accepted.provider_id,
            rejected = rejected.len(),
            "accepted match"
        );
        Ok(AcceptedMatch { accepted, rejected })
    }

    /// Rejects a pending match. The request stays `open`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotAuthorized`] or
    /// [`MarketError::InvalidStateTransition`].
    pub fn reject(&mut self, actor: &UserId, request: &ServiceRequest, id: &MatchId) -> Result<()> {
        if actor != &request.requester {
            return Err(MarketError::not_authorized("only the requester can reject a match"));
        }
        self.require_for_request(request, id)?
            .transition_to(MatchStatus::Rejected)?;
        info!(match_id = %id, "rejected match");
        Ok(())
    }

    /// Rejects every pending match for a request. Returns how many changed.
    pub fn reject_pending_for_request(&mut self, request_id: &RequestId) -> usize {
        let mut count = 0;
        for m in self.matches.values_mut() {
            if &m.request_id == request_id && m.status == MatchStatus::Pending {
                m.status = MatchStatus::Rejected;
                count += 1;
            }
        }
        count
    }

    /// Records the transaction created from an accepted match.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::AlreadyLinked`] if the match already has one.
    pub fn link_transaction(&mut self, id: &MatchId, transaction_id: &TransactionId) -> Result<()> {
        let m = self
            .matches
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("match", id))?;
        if let Some(existing) = &m.transaction_id {
            return Err(MarketError::AlreadyLinked {
                match_id: id.to_string(),
                transaction_id: existing.to_string(),
            });
        }
        m.transaction_id = Some(transaction_id.clone());
        Ok(())
    }

    /// Gets a match by ID.
    #[must_use]
    pub fn get(&self, id: &MatchId) -> Option<&SuggestedMatch> {
        self.matches.get(id)
    }

    /// Gets a match, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if absent.
    pub fn require(&self, id: &MatchId) -> Result<&SuggestedMatch> {
        self.matches
            .get(id)
            .ok_or_else(|| MarketError::not_found("match", id))
    }

    /// Matches for a request, best score first.
    #[must_use]
    pub fn for_request(&self, request_id: &RequestId) -> Vec<&SuggestedMatch> {
        let mut found: Vec<_> = self
            .matches
            .values()
            .filter(|m| &m.request_id == request_id)
            .collect();
        found.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.provider_id.cmp(&b.provider_id)));
        found
    }

    /// Matches suggesting a provider, newest first.
    #[must_use]
    pub fn for_provider(&self, provider: &UserId) -> Vec<&SuggestedMatch> {
        let mut found: Vec<_> = self
            .matches
            .values()
            .filter(|m| &m.provider_id == provider)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

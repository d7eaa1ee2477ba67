//! Skills, requests, matching and negotiation.

use serde::{Deserialize, Serialize};
use swap_core::{AttachmentId, MatchId, NegotiationId, RequestId, SkillId, UserId};
use swap_market::{
    ExchangeTerms, MarketError, Negotiation, NewRequest, NewSkill, NotificationKind, ServiceRequest,
    Skill, SuggestedMatch, Transaction,
};
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::facade::SkillSwap;

/// Result of answering a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    /// The answered proposal.
    pub negotiation: Negotiation,
    /// The transaction created when the proposal was accepted.
    pub transaction: Option<Transaction>,
}

impl SkillSwap {
    // ===================
    // Skills
    // ===================

    /// Lists a skill for the caller.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or skill.
    pub fn add_skill(&self, token: &str, skill: NewSkill) -> Result<Skill> {
        self.write_as(token, |db, me, now| {
            let id = db.skills.add(&me.user_id, skill, now)?;
            Ok(db.skills.require_owned(&me.user_id, &id)?.clone())
        })
    }

    /// Removes one of the caller's skills.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or a skill the caller does not own.
    pub fn remove_skill(&self, token: &str, skill_id: &SkillId) -> Result<Skill> {
        self.write_as(token, |db, me, _| Ok(db.skills.remove(&me.user_id, skill_id)?))
    }

    /// Adds a portfolio attachment to one of the caller's skills.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or a skill the caller does not own.
    pub fn attach_portfolio(&self, token: &str, skill_id: &SkillId, attachment: AttachmentId) -> Result<Skill> {
        self.write_as(token, |db, me, _| {
            db.skills.attach(&me.user_id, skill_id, attachment)?;
            Ok(db.skills.require_owned(&me.user_id, skill_id)?.clone())
        })
    }

    /// Skills listed by a user.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn skills_of(&self, token: &str, user_id: &UserId) -> Result<Vec<Skill>> {
        self.read_as(token, |db, _, _| {
            Ok(db.skills.owned_by(user_id).into_iter().cloned().collect())
        })
    }

    // ===================
    // Requests
    // ===================

    /// Posts a service request for the caller.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session, request or terms.
    pub fn create_request(&self, token: &str, request: NewRequest) -> Result<ServiceRequest> {
        self.write_as(token, |db, me, now| {
            let id = db.requests.create(&me.user_id, request, &db.skills, now)?;
            Ok(db.requests.require(&id)?.clone())
        })
    }

    /// Withdraws one of the caller's requests and rejects its pending
    /// matches.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the requester and the request is `open` or
    /// `matched` without a transaction. Once a transaction exists it is
    /// called off through the transaction instead.
    pub fn cancel_request(&self, token: &str, request_id: &RequestId) -> Result<ServiceRequest> {
        self.write_as(token, |db, me, now| {
            let linked = db
                .matches
                .for_request(request_id)
                .into_iter()
                .find_map(|m| m.transaction_id.clone());
            if let Some(transaction_id) = linked {
                return Err(MarketError::InvalidStateTransition {
                    from: format!("matched (transaction {transaction_id})"),
                    to: "cancelled".to_string(),
                }
                .into());
            }
            db.requests.cancel(&me.user_id, request_id, now)?;
            let rejected = db.matches.reject_pending_for_request(request_id);
            info!(request_id = %request_id, rejected, "withdrew request");
            Ok(db.requests.require(request_id)?.clone())
        })
    }

    /// A single request.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or an unknown request.
    pub fn request(&self, token: &str, request_id: &RequestId) -> Result<ServiceRequest> {
        self.read_as(token, |db, _, _| Ok(db.requests.require(request_id)?.clone()))
    }

    /// Open requests, newest first, optionally in one category.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn open_requests(&self, token: &str, category: Option<&str>) -> Result<Vec<ServiceRequest>> {
        self.read_as(token, |db, _, _| {
            Ok(db.requests.open(category).into_iter().cloned().collect())
        })
    }

    /// The caller's own requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn my_requests(&self, token: &str) -> Result<Vec<ServiceRequest>> {
        self.read_as(token, |db, me, _| {
            Ok(db.requests.by_requester(&me.user_id).into_iter().cloned().collect())
        })
    }

    // ===================
    // Matching
    // ===================

    /// Scores active providers with a skill in the request's category and
    /// records up to `limit` new suggestions (default from configuration).
    /// Each suggested provider is notified.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the requester or an admin and the request
    /// is `open`.
    pub fn suggest_matches(
        &self,
        token: &str,
        request_id: &RequestId,
        limit: Option<usize>,
    ) -> Result<Vec<SuggestedMatch>> {
        let limit = limit.unwrap_or(self.config().max_suggestions);
        self.write_as(token, |db, me, now| {
            let request = db.requests.require(request_id)?.clone();
            if request.requester != me.user_id && !me.role.is_admin() {
                return Err(ServiceError::forbidden("only the requester can ask for matches"));
            }
            let candidates: Vec<_> = db
                .skills
                .in_category(&request.category)
                .into_iter()
                .filter(|s| db.users.get(&s.owner).is_some_and(swap_auth::User::is_active))
                .map(|s| (s, db.provider_reputation(&s.owner)))
                .collect();
            let created = db.matches.suggest(&request, candidates, limit, now)?;

            for m in &created {
                db.notify(
                    &m.provider_id,
                    NotificationKind::MatchSuggested,
                    format!("You were suggested for \"{}\" (score {})", request.title, m.score),
                    &m.id,
                    now,
                );
            }
            Ok(created)
        })
    }

    /// Matches for a request, best first. Visible to the requester, the
    /// suggested providers, and admins.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session, an unknown request, or an outsider.
    pub fn matches_for_request(&self, token: &str, request_id: &RequestId) -> Result<Vec<SuggestedMatch>> {
        self.read_as(token, |db, me, _| {
            let request = db.requests.require(request_id)?;
            let all = db.matches.for_request(request_id);
            if request.requester == me.user_id || me.role.is_admin() {
                return Ok(all.into_iter().cloned().collect());
            }
            Ok(all
                .into_iter()
                .filter(|m| m.provider_id == me.user_id)
                .cloned()
                .collect())
        })
    }

    /// Matches suggesting the caller as provider, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn my_suggestions(&self, token: &str) -> Result<Vec<SuggestedMatch>> {
        self.read_as(token, |db, me, _| {
            Ok(db.matches.for_provider(&me.user_id).into_iter().cloned().collect())
        })
    }

    /// The requester accepts a suggestion. The request becomes `matched`,
    /// sibling suggestions are rejected, and the provider is notified.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the requester, the request is `open`, and
    /// the match is `pending`.
    pub fn accept_match(&self, token: &str, match_id: &MatchId) -> Result<SuggestedMatch> {
        self.write_as(token, |db, me, now| {
            let request_id = db.matches.require(match_id)?.request_id.clone();
            let request = db.requests.require(&request_id)?.clone();
            let outcome = db.matches.accept(&me.user_id, &request, match_id)?;
            db.requests
                .mark_matched(&request_id, &outcome.accepted.provider_id, now)?;
            db.notify(
                &outcome.accepted.provider_id,
                NotificationKind::MatchAccepted,
                format!("{} accepted you for \"{}\"", db.name_of(&me.user_id), request.title),
                &outcome.accepted.id,
                now,
            );
            Ok(outcome.accepted)
        })
    }

    /// The requester declines a suggestion. The request stays `open`.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the requester and the match is `pending`.
    pub fn reject_match(&self, token: &str, match_id: &MatchId) -> Result<SuggestedMatch> {
        self.write_as(token, |db, me, _| {
            let request_id = db.matches.require(match_id)?.request_id.clone();
            let request = db.requests.require(&request_id)?.clone();
            db.matches.reject(&me.user_id, &request, match_id)?;
            Ok(db.matches.require(match_id)?.clone())
        })
    }

    // ===================
    // Negotiation
    // ===================

    /// Either party to an accepted match proposes new terms. Any earlier
    /// pending proposal on the match expires; the counterparty is notified.
    ///
    /// # Errors
    ///
    /// Fails unless the match is `accepted` without a transaction, the
    /// caller is a party, and the terms are valid.
    pub fn propose_terms(&self, token: &str, match_id: &MatchId, terms: ExchangeTerms) -> Result<Negotiation> {
        let ttl = self.config().negotiation_ttl()?;
        self.write_as(token, |db, me, now| {
            let suggestion = db.matches.require(match_id)?;
            let request = db.requests.require(&suggestion.request_id)?;
            let proposal = db.negotiations.propose(
                &me.user_id,
                suggestion,
                request,
                terms,
                &db.skills,
                now,
                ttl,
            )?;
            let negotiation = proposal.negotiation;
            db.notify(
                &negotiation.counterparty,
                NotificationKind::TermsProposed,
                format!("{} proposed new terms", db.name_of(&me.user_id)),
                &negotiation.id,
                now,
            );
            Ok(negotiation)
        })
    }

    /// The counterparty answers a proposal. Accepting creates the
    /// transaction on the proposed terms. The proposer is notified either
    /// way.
    ///
    /// # Errors
    ///
    /// Fails unless the caller is the counterparty and the proposal is still
    /// pending and unexpired.
    pub fn respond_to_negotiation(
        &self,
        token: &str,
        negotiation_id: &NegotiationId,
        accept: bool,
    ) -> Result<NegotiationOutcome> {
        self.expire_negotiations_at(self.now());
        self.write_as(token, |db, me, now| {
            let negotiation = db.negotiations.respond(&me.user_id, negotiation_id, accept, now)?;
            let transaction = if accept {
                Some(db.open_transaction(&negotiation.match_id, negotiation.terms.clone(), now)?)
            } else {
                None
            };
            let verdict = if accept { "accepted" } else { "rejected" };
            db.notify(
                &negotiation.proposer,
                NotificationKind::NegotiationAnswered,
                format!("{} {verdict} your proposal", db.name_of(&me.user_id)),
                &negotiation.id,
                now,
            );
            Ok(NegotiationOutcome {
                negotiation,
                transaction,
            })
        })
    }

    /// Proposals on a match, oldest first. Visible to the parties and admins.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session, an unknown match, or an outsider.
    pub fn negotiations_for_match(&self, token: &str, match_id: &MatchId) -> Result<Vec<Negotiation>> {
        self.read_as(token, |db, me, _| {
            let suggestion = db.matches.require(match_id)?;
            let request = db.requests.require(&suggestion.request_id)?;
            let is_party = me.user_id == request.requester || me.user_id == suggestion.provider_id;
            if !is_party && !me.role.is_admin() {
                return Err(MarketError::not_authorized("not a party to this match").into());
            }
            Ok(db.negotiations.for_match(match_id).into_iter().cloned().collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use chrono::{Duration, Utc};
    use swap_core::Credits;
    use swap_market::{MatchStatus, NegotiationStatus, RequestStatus, SkillLevel};

    struct World {
        service: SkillSwap,
        clock: Clock,
        requester: String,
        provider: String,
        rival: String,
        request: ServiceRequest,
    }

    fn skill(level: SkillLevel) -> NewSkill {
        NewSkill {
            name: "Garden design".to_string(),
            category: "Garden".to_string(),
            level,
            hourly_rate: Credits::new(15),
            description: None,
            portfolio: Vec::new(),
        }
    }

    fn world() -> World {
        let clock = Clock::manual(Utc::now());
        let service = SkillSwap::in_memory().with_clock(clock.clone());
        let token = |email: &str| {
            service
                .register(email, email, "password123")
                .expect("register")
                .token
                .as_str()
                .to_string()
        };
        let requester = token("req@example.com");
        let provider = token("pro@example.com");
        let rival = token("rival@example.com");
        service.add_skill(&provider, skill(SkillLevel::Expert)).expect("skill");
        service.add_skill(&rival, skill(SkillLevel::Beginner)).expect("skill");
        let request = service
            .create_request(
                &requester,
                NewRequest {
                    title: "Plan a vegetable patch".to_string(),
                    description: String::new(),
                    category: "garden".to_string(),
                    terms: ExchangeTerms::credits(Credits::new(30)).with_hours(2),
                },
            )
            .expect("request");
        World {
            service,
            clock,
            requester,
            provider,
            rival,
            request,
        }
    }

    #[test]
    fn suggest_scores_and_notifies() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].score, 80);
        assert_eq!(matches[1].score, 50);
        assert_eq!(w.service.unread_count(&w.provider).expect("count"), 1);

        assert!(w.service.suggest_matches(&w.provider, &w.request.id, None).is_err());
        assert!(w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("again")
            .is_empty());
    }

    #[test]
    fn suspended_providers_are_not_suggested() {
        let w = world();
        let admin = w
            .service
            .bootstrap_admin("admin@example.com", "Admin", "password123")
            .expect("admin");
        let rival_id = w.service.whoami(&w.rival).expect("rival").id;
        w.service
            .suspend_user(admin.token.as_str(), &rival_id)
            .expect("suspend");

        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn accept_match_closes_siblings() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");

        assert!(w.service.accept_match(&w.provider, &matches[0].id).is_err());
        let accepted = w.service.accept_match(&w.requester, &matches[0].id).expect("accept");
        assert_eq!(accepted.status, MatchStatus::Accepted);

        let request = w.service.request(&w.requester, &w.request.id).expect("request");
        assert_eq!(request.status, RequestStatus::Matched);
        assert_eq!(Some(accepted.provider_id), request.provider);

        let all = w
            .service
            .matches_for_request(&w.requester, &w.request.id)
            .expect("matches");
        assert_eq!(all[1].status, MatchStatus::Rejected);
        assert_eq!(w.service.matches_for_request(&w.rival, &w.request.id).expect("own").len(), 1);
    }

    #[test]
    fn reject_keeps_request_open() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        let rejected = w.service.reject_match(&w.requester, &matches[1].id).expect("reject");
        assert_eq!(rejected.status, MatchStatus::Rejected);
        let request = w.service.request(&w.requester, &w.request.id).expect("request");
        assert_eq!(request.status, RequestStatus::Open);
    }

    #[test]
    fn negotiation_creates_transaction_on_new_terms() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        w.service.accept_match(&w.requester, &matches[0].id).expect("accept");

        let proposal = w
            .service
            .propose_terms(&w.provider, &matches[0].id, ExchangeTerms::credits(Credits::new(45)))
            .expect("propose");
        assert!(w.service.respond_to_negotiation(&w.provider, &proposal.id, true).is_err());

        let outcome = w
            .service
            .respond_to_negotiation(&w.requester, &proposal.id, true)
            .expect("respond");
        assert_eq!(outcome.negotiation.status, NegotiationStatus::Accepted);
        let tx = outcome.transaction.expect("transaction");
        assert_eq!(tx.terms.credits, Some(Credits::new(45)));

        assert!(w
            .service
            .propose_terms(&w.requester, &matches[0].id, ExchangeTerms::credits(Credits::new(1)))
            .is_err());
        assert_eq!(
            w.service
                .negotiations_for_match(&w.provider, &matches[0].id)
                .expect("list")
                .len(),
            1
        );
        assert!(w.service.negotiations_for_match(&w.rival, &matches[0].id).is_err());
    }

    #[test]
    fn expired_proposal_is_refused() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        w.service.accept_match(&w.requester, &matches[0].id).expect("accept");
        let proposal = w
            .service
            .propose_terms(&w.requester, &matches[0].id, ExchangeTerms::credits(Credits::new(20)))
            .expect("propose");

        w.clock.advance(Duration::hours(72));
        let err = w.service.respond_to_negotiation(&w.provider, &proposal.id, true);
        assert!(matches!(
            err,
            Err(ServiceError::Market(MarketError::NegotiationExpired { .. }))
        ));
        let stored = w
            .service
            .negotiations_for_match(&w.requester, &matches[0].id)
            .expect("list");
        assert_eq!(stored[0].status, NegotiationStatus::Expired);
    }

    #[test]
    fn cancel_request_rejects_pending_matches() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        let cancelled = w.service.cancel_request(&w.requester, &w.request.id).expect("cancel");
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert!(w.service.accept_match(&w.requester, &matches[0].id).is_err());
        let all = w
            .service
            .matches_for_request(&w.requester, &w.request.id)
            .expect("matches");
        assert!(all.iter().all(|m| m.status == MatchStatus::Rejected));
    }

    #[test]
    fn cancel_request_refused_once_transaction_exists() {
        let w = world();
        let matches = w
            .service
            .suggest_matches(&w.requester, &w.request.id, None)
            .expect("suggest");
        w.service.accept_match(&w.requester, &matches[0].id).expect("accept");
        let tx = w
            .service
            .create_transaction(&w.requester, &matches[0].id)
            .expect("transaction");

        let err = w
            .service
            .cancel_request(&w.requester, &w.request.id)
            .expect_err("transaction is open");
        assert_eq!(err.code(), "invalid_state");
        let request = w.service.request(&w.requester, &w.request.id).expect("request");
        assert_eq!(request.status, RequestStatus::Matched);

        w.service.confirm_completion(&w.provider, &tx.id).expect("provider confirms");
        let done = w
            .service
            .confirm_completion(&w.requester, &tx.id)
            .expect("requester confirms");
        assert_eq!(done.status, swap_market::TransactionStatus::Completed);
    }
}

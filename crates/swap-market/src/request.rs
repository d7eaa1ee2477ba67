//! Service requests and exchange terms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use swap_core::{Credits, RequestId, SkillId, UserId};
use tracing::info;

use crate::error::{MarketError, Result};
use crate::skill::{SkillCatalog, normalize_category};

/// Maximum length of a request title.
const MAX_TITLE_LEN: usize = 120;

/// How the requester pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMode {
    /// Pay with platform credits.
    Credits,
    /// Trade one of the requester's own skills.
    SkillSwap,
}

impl fmt::Display for ExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credits => write!(f, "credits"),
            Self::SkillSwap => write!(f, "skill_swap"),
        }
    }
}

impl FromStr for ExchangeMode {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "credits" => Ok(Self::Credits),
            "skill_swap" | "swap" => Ok(Self::SkillSwap),
            other => Err(MarketError::invalid_terms(format!("unknown exchange mode: {other}"))),
        }
    }
}

/// What the requester offers in exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTerms {
    /// Payment mode.
    pub mode: ExchangeMode,
    /// Credits offered, in credit mode.
    pub credits: Option<Credits>,
    /// Skill offered, in skill-swap mode.
    pub offered_skill: Option<SkillId>,
    /// Estimated hours of work.
    pub hours: Option<u32>,
    /// Free-form note.
    pub note: Option<String>,
}

impl ExchangeTerms {
    /// Credit-mode terms.
    #[must_use]
    pub const fn credits(amount: Credits) -> Self {
        Self {
            mode: ExchangeMode::Credits,
            credits: Some(amount),
            offered_skill: None,
            hours: None,
            note: None,
        }
    }

    /// Skill-swap terms.
    #[must_use]
    pub const fn skill_swap(skill: SkillId) -> Self {
        Self {
            mode: ExchangeMode::SkillSwap,
            credits: None,
            offered_skill: Some(skill),
            hours: None,
            note: None,
        }
    }

    /// Sets the estimated hours.
    #[must_use]
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours = Some(hours);
        self
    }

    /// Sets the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Credits that move when a transaction on these terms completes.
    #[must_use]
    pub fn settlement_amount(&self) -> Option<Credits> {
        match self.mode {
            ExchangeMode::Credits => self.credits.filter(|c| !c.is_zero()),
            ExchangeMode::SkillSwap => None,
        }
    }

    /// Estimated hours, defaulting to one.
    #[must_use]
    pub fn estimated_hours(&self) -> u32 {
        self.hours.unwrap_or(1).max(1)
    }

    /// Checks the terms are complete for their mode.
    ///
    /// Credit mode needs a positive amount. Skill-swap mode needs an offered
    /// skill owned by `requester`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidTerms`] otherwise.
    pub fn validate(&self, requester: &UserId, catalog: &SkillCatalog) -> Result<()> {
        if self.hours == Some(0) {
            return Err(MarketError::invalid_terms("estimated hours must be positive"));
        }
        match self.mode {
            ExchangeMode::Credits => {
                if self.settlement_amount().is_none() {
                    return Err(MarketError::invalid_terms(
                        "credit exchange needs a positive credit amount",
                    ));
                }
            }
            ExchangeMode::SkillSwap => {
                let skill = self
                    .offered_skill
                    .as_ref()
                    .ok_or_else(|| MarketError::invalid_terms("skill swap needs an offered skill"))?;
                catalog
                    .require_owned(requester, skill)
                    .map_err(|e| MarketError::invalid_terms(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Lifecycle of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Accepting matches.
    Open,
    /// A provider was chosen.
    Matched,
    /// Work has started.
    InProgress,
    /// Work finished and confirmed.
    Completed,
    /// Withdrawn or abandoned.
    Cancelled,
}

impl RequestStatus {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        use RequestStatus::{Cancelled, Completed, InProgress, Matched, Open};

        matches!(
            (self, target),
            (Open, Matched | Cancelled)
                | (Matched, InProgress | Completed | Cancelled)
                | (InProgress, Completed | Cancelled)
        )
    }

    /// Returns true for `completed` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Matched => write!(f, "matched"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A request for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Request identifier.
    pub id: RequestId,
    /// The user asking for the service.
    pub requester: UserId,
    /// Short title.
    pub title: String,
    /// Details.
    pub description: String,
    /// Normalized category used for matching.
    pub category: String,
    /// What the requester offers.
    pub terms: ExchangeTerms,
    /// Current status.
    pub status: RequestStatus,
    /// Chosen provider once matched.
    pub provider: Option<UserId>,
    /// When the request was posted.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    fn transition_to(&mut self, target: RequestStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status.can_transition_to(target) {
            self.status = target;
            self.updated_at = now;
            Ok(())
        } else {
            Err(MarketError::InvalidStateTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }
}

/// Input for posting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    /// Short title.
    pub title: String,
    /// Details.
    pub description: String,
    /// Category, normalized on insert.
    pub category: String,
    /// What the requester offers.
    pub terms: ExchangeTerms,
}

/// Every service request.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RequestBoard {
    requests: HashMap<RequestId, ServiceRequest>,
}

impl RequestBoard {
    /// Creates a new empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts an open request.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] for a blank or overlong title or
    /// blank category, and [`MarketError::InvalidTerms`] for incomplete terms.
    pub fn create(
        &mut self,
        requester: &UserId,
        request: NewRequest,
        catalog: &SkillCatalog,
        now: DateTime<Utc>,
    ) -> Result<RequestId> {
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(MarketError::InvalidRequest {
                reason: "title cannot be empty".to_string(),
            });
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(MarketError::InvalidRequest {
                reason: format!("title exceeds {MAX_TITLE_LEN} characters"),
            });
        }
        let category = normalize_category(&request.category).map_err(|_| MarketError::InvalidRequest {
            reason: "category cannot be empty".to_string(),
        })?;
        request.terms.validate(requester, catalog)?;

        let id = RequestId::new();
        self.requests.insert(
            id.clone(),
            ServiceRequest {
                id: id.clone(),
                requester: requester.clone(),
                title,
                description: request.description.trim().to_string(),
                category: category.clone(),
                terms: request.terms,
                status: RequestStatus::Open,
                provider: None,
                created_at: now,
                updated_at: now,
            },
        );
        info!(request_id = %id, requester = %requester, %category, "posted request");
        Ok(id)
    }

    /// Gets a request by ID.
    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<&ServiceRequest> {
        self.requests.get(id)
    }

    /// Gets a request, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if absent.
    pub fn require(&self, id: &RequestId) -> Result<&ServiceRequest> {
        self.requests
            .get(id)
            .ok_or_else(|| MarketError::not_found("request", id))
    }

    fn require_mut(&mut self, id: &RequestId) -> Result<&mut ServiceRequest> {
        self.requests
            .get_mut(id)
            .ok_or_else(|| MarketError::not_found("request", id))
    }

    /// Withdraws a request. Only its requester may, and only while `open` or
    /// `matched`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotAuthorized`] or
    /// [`MarketError::InvalidStateTransition`].
    pub fn cancel(&mut self, requester: &UserId, id: &RequestId, now: DateTime<Utc>) -> Result<()> {
        let request = self.require_mut(id)?;
        if &request.requester != requester {
            return Err(MarketError::not_authorized("only the requester can cancel a request"));
        }
        if !matches!(request.status, RequestStatus::Open | RequestStatus::Matched) {
            return Err(MarketError::InvalidStateTransition {
                from: request.status.to_string(),
                to: RequestStatus::Cancelled.to_string(),
            });
        }
        request.transition_to(RequestStatus::Cancelled, now)?;
        info!(request_id = %id, "cancelled request");
        Ok(())
    }

    /// Records the chosen provider.
    ///
    /// # Errors
    ///
    /// Fails unless the request is `open`.
    pub fn mark_matched(&mut self, id: &RequestId, provider: &UserId, now: DateTime<Utc>) -> Result<()> {
        let request = self.require_mut(id)?;
        request.transition_to(RequestStatus::Matched, now)?;
        request.provider = Some(provider.clone());
        Ok(())
    }

    /// Moves the request to `in_progress`.
    ///
    /// # Errors
    ///
    /// Fails unless the request is `matched`.
    pub fn mark_in_progress(&mut self, id: &RequestId, now: DateTime<Utc>) -> Result<()> {
        self.require_mut(id)?
            .transition_to(RequestStatus::InProgress, now)
    }

    /// Moves the request to `completed`.
    ///
    /// # Errors
    ///
    /// Fails unless the request is `matched` or `in_progress`.
    pub fn mark_completed(&mut self, id: &RequestId, now: DateTime<Utc>) -> Result<()> {
        self.require_mut(id)?
            .transition_to(RequestStatus::Completed, now)
    }

    /// Moves the request to `cancelled` on behalf of a transaction.
    ///
    /// # Errors
    ///
    /// Fails if the request is already terminal.
    pub fn mark_cancelled(&mut self, id: &RequestId, now: DateTime<Utc>) -> Result<()> {
        self.require_mut(id)?
            .transition_to(RequestStatus::Cancelled, now)
    }

    /// Open requests, newest first, optionally filtered by category.
    #[must_use]
    pub fn open(&self, category: Option<&str>) -> Vec<&ServiceRequest> {
        let wanted = category.map(|c| c.trim().to_lowercase());
        let mut found: Vec<_> = self
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Open)
            .filter(|r| wanted.as_ref().is_none_or(|c| &r.category == c))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Requests posted by a user, newest first.
    #[must_use]
    pub fn by_requester(&self, requester: &UserId) -> Vec<&ServiceRequest> {
        let mut found: Vec<_> = self
            .requests
            .values()
            .filter(|r| &r.requester == requester)
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{NewSkill, SkillLevel};
    use test_case::test_case;

    fn plumbing(terms: ExchangeTerms) -> NewRequest {
        NewRequest {
            title: "Fix a leaking tap".to_string(),
            description: "Kitchen, drips overnight".to_string(),
            category: "Plumbing".to_string(),
            terms,
        }
    }

    #[test_case(RequestStatus::Open, RequestStatus::Matched, true)]
    #[test_case(RequestStatus::Open, RequestStatus::Cancelled, true)]
    #[test_case(RequestStatus::Open, RequestStatus::Completed, false)]
    #[test_case(RequestStatus::Matched, RequestStatus::InProgress, true)]
    #[test_case(RequestStatus::InProgress, RequestStatus::Completed, true)]
    #[test_case(RequestStatus::Completed, RequestStatus::Cancelled, false)]
    #[test_case(RequestStatus::Cancelled, RequestStatus::Open, false)]
    fn status_transitions(from: RequestStatus, to: RequestStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn credit_terms_need_positive_amount() {
        let catalog = SkillCatalog::new();
        let user = UserId::new();
        assert!(ExchangeTerms::credits(Credits::new(30)).validate(&user, &catalog).is_ok());
        assert!(matches!(
            ExchangeTerms::credits(Credits::ZERO).validate(&user, &catalog),
            Err(MarketError::InvalidTerms { .. })
        ));
        assert!(
            ExchangeTerms::credits(Credits::new(5))
                .with_hours(0)
                .validate(&user, &catalog)
                .is_err()
        );
    }

    #[test]
    fn swap_terms_need_owned_skill() {
        let mut catalog = SkillCatalog::new();
        let user = UserId::new();
        let other = UserId::new();
        let skill = catalog
            .add(
                &user,
                NewSkill {
                    name: "Baking".to_string(),
                    category: "food".to_string(),
                    level: SkillLevel::Intermediate,
                    hourly_rate: Credits::new(10),
                    description: None,
                    portfolio: Vec::new(),
                },
                Utc::now(),
            )
            .expect("add");

        let terms = ExchangeTerms::skill_swap(skill);
        assert!(terms.validate(&user, &catalog).is_ok());
        assert!(terms.validate(&other, &catalog).is_err());
        assert_eq!(terms.settlement_amount(), None);
    }

    #[test]
    fn create_and_cancel() {
        let mut board = RequestBoard::new();
        let catalog = SkillCatalog::new();
        let requester = UserId::new();
        let now = Utc::now();
        let id = board
            .create(&requester, plumbing(ExchangeTerms::credits(Credits::new(40))), &catalog, now)
            .expect("create");

        let request = board.get(&id).expect("request");
        assert_eq!(request.status, RequestStatus::Open);
        assert_eq!(request.category, "plumbing");
        assert_eq!(board.open(Some("PLUMBING")).len(), 1);
        assert!(board.open(Some("music")).is_empty());

        assert!(matches!(
            board.cancel(&UserId::new(), &id, now),
            Err(MarketError::NotAuthorized { .. })
        ));
        board.cancel(&requester, &id, now).expect("cancel");
        assert_eq!(board.get(&id).expect("request").status, RequestStatus::Cancelled);
        assert!(board.cancel(&requester, &id, now).is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut board = RequestBoard::new();
        let mut request = plumbing(ExchangeTerms::credits(Credits::new(40)));
        request.title = " ".to_string();
        let err = board.create(&UserId::new(), request, &SkillCatalog::new(), Utc::now());
        assert!(matches!(err, Err(MarketError::InvalidRequest { .. })));
    }

    #[test]
    fn in_progress_request_cannot_be_withdrawn() {
        let mut board = RequestBoard::new();
        let requester = UserId::new();
        let now = Utc::now();
        let id = board
            .create(&requester, plumbing(ExchangeTerms::credits(Credits::new(40))), &SkillCatalog::new(), now)
            .expect("create");
        board.mark_matched(&id, &UserId::new(), now).expect("match");
        board.mark_in_progress(&id, now).expect("start");
        assert!(matches!(
            board.cancel(&requester, &id, now),
            Err(MarketError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn exchange_mode_parses() {
        assert_eq!("skill-swap".parse::<ExchangeMode>(), Ok(ExchangeMode::SkillSwap));
        assert_eq!("credits".parse::<ExchangeMode>(), Ok(ExchangeMode::Credits));
        assert!("barter".parse::<ExchangeMode>().is_err());
    }
}

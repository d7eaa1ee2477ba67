//! Ratings and reputation.
//!
//! Each party may rate the other once per completed transaction;
//! re-submitting updates the existing rating in place. Reputation is the mean
//! score received in each role, rounded to one decimal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use swap_core::{RatingId, TransactionId, UserId};
use tracing::info;

use crate::error::{MarketError, Result};
use crate::transaction::{Party, Transaction, TransactionStatus};

/// A score between 1 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RatingScore(u8);

impl RatingScore {
    /// Lowest accepted score.
    pub const MIN: u8 = 1;
    /// Highest accepted score.
    pub const MAX: u8 = 5;

    /// Creates a score.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidScore`] outside 1..=5.
    pub fn new(score: u8) -> Result<Self> {
        if score < Self::MIN || score > Self::MAX {
            return Err(MarketError::InvalidScore { score });
        }
        Ok(Self(score))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RatingScore {
    type Error = MarketError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RatingScore> for u8 {
    fn from(score: RatingScore) -> Self {
        score.0
    }
}

/// The role the ratee played in the rated transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatedRole {
    /// Rated for work performed.
    Provider,
    /// Rated as a client.
    Requester,
}

impl From<Party> for RatedRole {
    fn from(party: Party) -> Self {
        match party {
            Party::Provider => Self::Provider,
            Party::Requester => Self::Requester,
        }
    }
}

impl fmt::Display for RatedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Requester => write!(f, "requester"),
        }
    }
}

/// One party's rating of the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Rating identifier.
    pub id: RatingId,
    /// The rated transaction.
    pub transaction_id: TransactionId,
    /// Who gave the rating.
    pub rater: UserId,
    /// Who received it.
    pub ratee: UserId,
    /// The ratee's role in the transaction.
    pub role: RatedRole,
    /// Score.
    pub score: RatingScore,
    /// Optional comment.
    pub comment: Option<String>,
    /// First submission.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Aggregate for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleReputation {
    /// Mean score, rounded to one decimal.
    pub average: f64,
    /// Number of ratings received.
    pub count: usize,
}

impl RoleReputation {
    #[allow(clippy::cast_precision_loss)]
    fn from_scores(scores: &[u8]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let total: u32 = scores.iter().map(|s| u32::from(*s)).sum();
        let mean = f64::from(total) / scores.len() as f64;
        Some(Self {
            average: (mean * 10.0).round() / 10.0,
            count: scores.len(),
        })
    }
}

/// A user's reputation in each role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reputation {
    /// The user.
    pub user_id: UserId,
    /// Ratings received as a provider.
    pub as_provider: Option<RoleReputation>,
    /// Ratings received as a requester.
    pub as_requester: Option<RoleReputation>,
}

impl Reputation {
    /// Average as a provider, used for matching.
    #[must_use]
    pub fn provider_average(&self) -> Option<f64> {
        self.as_provider.map(|r| r.average)
    }

    /// Total ratings received.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.as_provider.map_or(0, |r| r.count) + self.as_requester.map_or(0, |r| r.count)
    }
}

/// Every rating.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RatingBook {
    ratings: Vec<Rating>,
}

impl RatingBook {
    /// Creates a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rates the other party of a completed transaction.
    ///
    /// Returns the stored rating and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is not `completed` or the rater is not a
    /// party.
    pub fn submit(
        &mut self,
        rater: &UserId,
        tx: &Transaction,
        score: RatingScore,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Rating, bool)> {
        let party = tx.require_party(rater)?;
        if tx.status != TransactionStatus::Completed {
            return Err(MarketError::NotRateable {
                id: tx.id.to_string(),
                status: tx.status.to_string(),
            });
        }
        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        if let Some(existing) = self
            .ratings
            .iter_mut()
            .find(|r| r.transaction_id == tx.id && &r.rater == rater)
        {
            existing.score = score;
            existing.comment = comment;
            existing.updated_at = now;
            info!(rating_id = %existing.id, transaction_id = %tx.id, "updated rating");
            return Ok((existing.clone(), false));
        }

        let ratee_side = party.other();
        let rating = Rating {
            id: RatingId::new(),
            transaction_id: tx.id.clone(),
            rater: rater.clone(),
            ratee: tx.user(ratee_side).clone(),
            role: ratee_side.into(),
            score,
            comment,
            created_at: now,
            updated_at: now,
        };
        info!(
            rating_id = %rating.id,
            transaction_id = %tx.id,
            ratee = %rating.ratee,
            score = score.get(),
            "recorded rating"
        );
        self.ratings.push(rating.clone());
        Ok((rating, true))
    }

    /// Aggregates a user's received ratings.
    #[must_use]
    pub fn reputation(&self, user: &UserId) -> Reputation {
        self.reputation_where(user, |_| true)
    }

    /// Like [`reputation`](Self::reputation), counting only ratings for
    /// which `counts` holds.
    #[must_use]
    pub fn reputation_where(&self, user: &UserId, counts: impl Fn(&Rating) -> bool) -> Reputation {
        let scores = |role: RatedRole| -> Vec<u8> {
            self.ratings
                .iter()
                .filter(|r| &r.ratee == user && r.role == role && counts(r))
                .map(|r| r.score.get())
                .collect()
        };
        Reputation {
            user_id: user.clone(),
            as_provider: RoleReputation::from_scores(&scores(RatedRole::Provider)),
            as_requester: RoleReputation::from_scores(&scores(RatedRole::Requester)),
        }
    }

    /// Ratings a user received, newest first.
    #[must_use]
    pub fn received_by(&self, user: &UserId) -> Vec<&Rating> {
        self.ratings.iter().rev().filter(|r| &r.ratee == user).collect()
    }

    /// Ratings attached to a transaction.
    #[must_use]
    pub fn for_transaction(&self, tx: &TransactionId) -> Vec<&Rating> {
        self.ratings.iter().filter(|r| &r.transaction_id == tx).collect()
    }

    /// Number of stored ratings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Returns true if no ratings are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ExchangeTerms;
    use proptest::prelude::*;
    use swap_core::{Credits, MatchId, RequestId};
    use test_case::test_case;

    fn completed(requester: &UserId, provider: &UserId) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            match_id: MatchId::new(),
            request_id: RequestId::new(),
            requester: requester.clone(),
            provider: provider.clone(),
            terms: ExchangeTerms::credits(Credits::new(10)),
            requester_confirmed: true,
            provider_confirmed: true,
            status: TransactionStatus::Completed,
            created_at: now,
            started_at: None,
            completed_at: Some(now),
            dispute: None,
            resolution: None,
            credits_settled: true,
        }
    }

    fn score(n: u8) -> RatingScore {
        RatingScore::new(n).expect("valid score")
    }

    #[test_case(0, false)]
    #[test_case(1, true)]
    #[test_case(5, true)]
    #[test_case(6, false)]
    fn score_bounds(value: u8, ok: bool) {
        assert_eq!(RatingScore::new(value).is_ok(), ok);
    }

    #[test]
    fn score_deserialization_is_checked() {
        assert!(serde_json::from_str::<RatingScore>("4").is_ok());
        assert!(serde_json::from_str::<RatingScore>("9").is_err());
    }

    #[test]
    fn each_party_rates_the_other() {
        let requester = UserId::new();
        let provider = UserId::new();
        let tx = completed(&requester, &provider);
        let mut book = RatingBook::new();
        let now = Utc::now();

        let (for_provider, created) = book
            .submit(&requester, &tx, score(5), Some("great".to_string()), now)
            .expect("rate");
        assert!(created);
        assert_eq!(for_provider.ratee, provider);
        assert_eq!(for_provider.role, RatedRole::Provider);

        let (for_requester, _) = book.submit(&provider, &tx, score(4), None, now).expect("rate");
        assert_eq!(for_requester.ratee, requester);
        assert_eq!(for_requester.role, RatedRole::Requester);
        assert_eq!(book.for_transaction(&tx.id).len(), 2);
    }

    #[test]
    fn resubmission_updates_in_place() {
        let requester = UserId::new();
        let provider = UserId::new();
        let tx = completed(&requester, &provider);
        let mut book = RatingBook::new();
        let now = Utc::now();

        let (first, _) = book.submit(&requester, &tx, score(2), None, now).expect("rate");
        let later = now + chrono::Duration::minutes(5);
        let (second, created) = book
            .submit(&requester, &tx, score(4), Some("better after all".to_string()), later)
            .expect("rate");

        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.score, score(4));
        assert_eq!(second.updated_at, later);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn only_completed_transactions_by_parties() {
        let requester = UserId::new();
        let provider = UserId::new();
        let mut tx = completed(&requester, &provider);
        let mut book = RatingBook::new();

        assert!(matches!(
            book.submit(&UserId::new(), &tx, score(3), None, Utc::now()),
            Err(MarketError::NotAuthorized { .. })
        ));
        tx.status = TransactionStatus::InProgress;
        assert!(matches!(
            book.submit(&requester, &tx, score(3), None, Utc::now()),
            Err(MarketError::NotRateable { .. })
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn reputation_is_rounded_per_role() {
        let provider = UserId::new();
        let mut book = RatingBook::new();
        for value in [5, 4, 4] {
            let tx = completed(&UserId::new(), &provider);
            book.submit(&tx.requester.clone(), &tx, score(value), None, Utc::now())
                .expect("rate");
        }

        let rep = book.reputation(&provider);
        let as_provider = rep.as_provider.expect("rated");
        assert!((as_provider.average - 4.3).abs() < f64::EPSILON);
        assert_eq!(as_provider.count, 3);
        assert!(rep.as_requester.is_none());
        assert_eq!(rep.total_count(), 3);
        assert!(book.reputation(&UserId::new()).provider_average().is_none());
    }

    proptest! {
        #[test]
        fn average_stays_within_bounds(scores in prop::collection::vec(1u8..=5, 1..50)) {
            let rep = RoleReputation::from_scores(&scores).expect("non-empty");
            prop_assert!(rep.average >= 1.0 && rep.average <= 5.0);
            prop_assert_eq!(rep.count, scores.len());
            prop_assert!(((rep.average * 10.0).round() - rep.average * 10.0).abs() < 1e-9);
        }
    }
}

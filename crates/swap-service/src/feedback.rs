//! Ratings, reputation and notifications.

use swap_core::{NotificationId, TransactionId, UserId};
use swap_market::{Notification, NotificationKind, Rating, RatingScore, Reputation};

use crate::error::Result;
use crate::facade::SkillSwap;

impl SkillSwap {
    /// Rates the other party of a completed transaction. Submitting again
    /// replaces the caller's earlier rating. The ratee is notified of new
    /// ratings.
    ///
    /// # Errors
    ///
    /// Fails for a score outside 1..=5, an outsider, or a transaction that is
    /// not `completed`.
    pub fn submit_rating(
        &self,
        token: &str,
        tx_id: &TransactionId,
        score: u8,
        comment: Option<String>,
    ) -> Result<Rating> {
        let score = RatingScore::new(score)?;
        self.write_as(token, |db, me, now| {
            let tx = db.transactions.require(tx_id)?;
            let (rating, created) = db.ratings.submit(&me.user_id, tx, score, comment, now)?;
            if created {
                db.notify(
                    &rating.ratee,
                    NotificationKind::RatingReceived,
                    format!("{} rated you {}/5", db.name_of(&me.user_id), score.get()),
                    &rating.id,
                    now,
                );
            }
            Ok(rating)
        })
    }

    /// A user's reputation, split by role.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or an unknown user.
    pub fn reputation(&self, token: &str, user_id: &UserId) -> Result<Reputation> {
        self.read_as(token, |db, _, _| {
            db.users.require(user_id)?;
            Ok(db.reputation_of(user_id))
        })
    }

    /// Ratings a user has received, newest first.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or an unknown user.
    pub fn ratings_for(&self, token: &str, user_id: &UserId) -> Result<Vec<Rating>> {
        self.read_as(token, |db, _, _| {
            db.users.require(user_id)?;
            Ok(db.ratings.received_by(user_id).into_iter().cloned().collect())
        })
    }

    /// The caller's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn notifications(&self, token: &str, unread_only: bool) -> Result<Vec<Notification>> {
        self.read_as(token, |db, me, _| {
            Ok(db
                .inbox
                .list(&me.user_id, unread_only)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    /// How many of the caller's notifications are unread.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn unread_count(&self, token: &str) -> Result<usize> {
        self.read_as(token, |db, me, _| Ok(db.inbox.unread_count(&me.user_id)))
    }

    /// Marks one of the caller's notifications read.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown IDs and for other users' notifications.
    pub fn mark_read(&self, token: &str, id: &NotificationId) -> Result<()> {
        self.write_as(token, |db, me, _| Ok(db.inbox.mark_read(&me.user_id, id)?))
    }

    /// Marks all of the caller's notifications read. Returns how many
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn mark_all_read(&self, token: &str) -> Result<usize> {
        self.write_as(token, |db, me, _| Ok(db.inbox.mark_all_read(&me.user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use swap_core::Credits;
    use swap_market::{ExchangeTerms, MarketError, NewRequest, NewSkill, RatedRole, SkillLevel, Transaction};
    use test_case::test_case;

    fn completed() -> (SkillSwap, String, String, Transaction) {
        let service = SkillSwap::in_memory();
        let requester = service
            .register("req@example.com", "Rita", "password123")
            .expect("register")
            .token
            .as_str()
            .to_string();
        let provider = service
            .register("pro@example.com", "Paul", "password123")
            .expect("register")
            .token
            .as_str()
            .to_string();
        service
            .add_skill(
                &provider,
                NewSkill {
                    name: "Portraits".to_string(),
                    category: "art".to_string(),
                    level: SkillLevel::Expert,
                    hourly_rate: Credits::new(5),
                    description: None,
                    portfolio: Vec::new(),
                },
            )
            .expect("skill");
        let request = service
            .create_request(
                &requester,
                NewRequest {
                    title: "Draw my dog".to_string(),
                    description: String::new(),
                    category: "art".to_string(),
                    terms: ExchangeTerms::credits(Credits::new(20)),
                },
            )
            .expect("request");
        let m = service
            .suggest_matches(&requester, &request.id, None)
            .expect("suggest")
            .remove(0);
        service.accept_match(&requester, &m.id).expect("accept");
        let tx = service.create_transaction(&requester, &m.id).expect("tx");
        service.confirm_completion(&requester, &tx.id).expect("confirm");
        let tx = service.confirm_completion(&provider, &tx.id).expect("confirm");
        (service, requester, provider, tx)
    }

    #[test_case(0 ; "zero")]
    #[test_case(6 ; "six")]
    fn out_of_range_scores_are_rejected(score: u8) {
        let (service, requester, _, tx) = completed();
        assert!(matches!(
            service.submit_rating(&requester, &tx.id, score, None),
            Err(ServiceError::Market(MarketError::InvalidScore { .. }))
        ));
    }

    #[test]
    fn ratings_feed_reputation() {
        let (service, requester, provider, tx) = completed();
        let rating = service
            .submit_rating(&requester, &tx.id, 4, Some("Lovely".to_string()))
            .expect("rate");
        assert_eq!(rating.role, RatedRole::Provider);

        let updated = service.submit_rating(&requester, &tx.id, 5, None).expect("re-rate");
        assert_eq!(updated.id, rating.id);

        let reputation = service.reputation(&requester, &tx.provider).expect("reputation");
        assert_eq!(reputation.as_provider.as_ref().map(|r| r.count), Some(1));
        assert_eq!(reputation.provider_average(), Some(5.0));
        assert_eq!(service.ratings_for(&provider, &tx.provider).expect("ratings").len(), 1);
    }

    #[test]
    fn mark_all_read_clears_inbox() {
        let (service, requester, provider, tx) = completed();
        service.submit_rating(&requester, &tx.id, 5, None).expect("rate");
        let unread = service.notifications(&provider, true).expect("list");
        assert!(!unread.is_empty());
        assert_eq!(unread[0].kind, NotificationKind::RatingReceived);

        service.mark_read(&provider, &unread[0].id).expect("read one");
        assert_eq!(service.unread_count(&provider).expect("count"), unread.len() - 1);
        assert!(service.mark_read(&requester, &unread[0].id).is_err());

        service.mark_all_read(&provider).expect("read all");
        assert_eq!(service.unread_count(&provider).expect("count"), 0);
    }
}

//! End-to-end tests for a credit exchange.
//!
//! Walks the complete lifecycle:
//! 1. Registration and the signup bonus
//! 2. Skill listing and request posting
//! 3. Matching and acceptance
//! 4. Transaction start and dual confirmation
//! 5. Settlement, ratings and notifications

use swap_core::Credits;
use swap_ledger::EntryType;
use swap_market::{
    ExchangeTerms, NewRequest, NewSkill, NotificationKind, RequestStatus, SkillLevel,
    TransactionStatus,
};
use swap_service::{AuthSession, SkillSwap};
use test_case::test_case;

// ============================================================================
// Helper Functions
// ============================================================================

fn register(service: &SkillSwap, name: &str) -> AuthSession {
    let email = format!("{}@example.com", name.to_lowercase());
    service
        .register(&email, name, "password123")
        .expect("register")
}

fn token(session: &AuthSession) -> &str {
    session.token.as_str()
}

fn guitar_skill() -> NewSkill {
    NewSkill {
        name: "Guitar lessons".to_string(),
        category: "Music".to_string(),
        level: SkillLevel::Expert,
        hourly_rate: Credits::new(15),
        description: None,
        portfolio: Vec::new(),
    }
}

fn guitar_request(credits: u64) -> NewRequest {
    NewRequest {
        title: "Learn guitar".to_string(),
        description: "Two beginner lessons".to_string(),
        category: "music".to_string(),
        terms: ExchangeTerms::credits(Credits::new(credits)).with_hours(2),
    }
}

struct Exchange {
    service: SkillSwap,
    requester: AuthSession,
    provider: AuthSession,
    tx_id: swap_core::TransactionId,
}

fn started_exchange(credits: u64) -> Exchange {
    let service = SkillSwap::in_memory();
    let requester = register(&service, "Ada");
    let provider = register(&service, "Bob");

    service.add_skill(token(&provider), guitar_skill()).expect("skill");
    let request = service
        .create_request(token(&requester), guitar_request(credits))
        .expect("request");
    let suggestions = service
        .suggest_matches(token(&requester), &request.id, None)
        .expect("suggest");
    assert_eq!(suggestions.len(), 1);
    let accepted = service
        .accept_match(token(&requester), &suggestions[0].id)
        .expect("accept");
    let tx = service
        .create_transaction(token(&requester), &accepted.id)
        .expect("transaction");
    service.start_transaction(token(&provider), &tx.id).expect("start");

    Exchange {
        service,
        requester,
        provider,
        tx_id: tx.id,
    }
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn registration_grants_one_hundred_credits() {
    let service = SkillSwap::in_memory();
    let ada = register(&service, "Ada");

    let balance = service.balance(token(&ada)).expect("balance");
    assert_eq!(balance.credits, 100);
    assert!(balance.verified);

    let history = service.credit_history(token(&ada), None).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entry_type, EntryType::Initial);
}

#[test]
fn wrong_password_fails_login() {
    let service = SkillSwap::in_memory();
    register(&service, "Ada");
    let err = service
        .login("ada@example.com", "not-the-password")
        .expect_err("login must fail");
    assert_eq!(err.code(), "invalid_credentials");
}

// ============================================================================
// Settlement
// ============================================================================

#[test]
fn one_confirmation_leaves_transaction_open() {
    let ex = started_exchange(30);
    let tx = ex
        .service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("confirm");
    assert_eq!(tx.status, TransactionStatus::InProgress);
    assert!(tx.requester_confirmed);
    assert!(!tx.provider_confirmed);
    assert_eq!(ex.service.balance(token(&ex.requester)).expect("balance").credits, 100);
}

#[test]
fn both_confirmations_settle_credits() {
    let ex = started_exchange(30);
    ex.service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("requester confirms");
    let tx = ex
        .service
        .confirm_completion(token(&ex.provider), &ex.tx_id)
        .expect("provider confirms");

    assert_eq!(tx.status, TransactionStatus::Completed);
    assert!(tx.credits_settled);
    assert_eq!(ex.service.balance(token(&ex.requester)).expect("balance").credits, 70);
    assert_eq!(ex.service.balance(token(&ex.provider)).expect("balance").credits, 130);

    let request = ex
        .service
        .request(token(&ex.requester), &tx.request_id)
        .expect("request");
    assert_eq!(request.status, RequestStatus::Completed);
}

#[test]
fn balance_equals_sum_of_history() {
    let ex = started_exchange(45);
    ex.service
        .confirm_completion(token(&ex.provider), &ex.tx_id)
        .expect("provider confirms");
    ex.service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("requester confirms");

    for session in [&ex.requester, &ex.provider] {
        let balance = ex.service.balance(token(session)).expect("balance");
        let history = ex.service.credit_history(token(session), None).expect("history");
        let sum: i64 = history.iter().map(|e| e.amount).sum();
        assert_eq!(balance.credits, sum);
        assert_eq!(history[0].balance_after, balance.credits);
    }
}

#[test]
fn unaffordable_completion_is_refused() {
    let ex = started_exchange(150);
    ex.service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("requester confirms");
    let err = ex
        .service
        .confirm_completion(token(&ex.provider), &ex.tx_id)
        .expect_err("cannot settle");
    assert_eq!(err.code(), "insufficient_credits");

    let tx = ex
        .service
        .transaction(token(&ex.provider), &ex.tx_id)
        .expect("transaction");
    assert_eq!(tx.status, TransactionStatus::InProgress);
    assert!(!tx.provider_confirmed);
}

// ============================================================================
// Ratings and notifications
// ============================================================================

#[test_case(0 ; "below range")]
#[test_case(6 ; "above range")]
fn out_of_range_scores_are_rejected(score: u8) {
    let ex = started_exchange(30);
    ex.service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("confirm");
    ex.service
        .confirm_completion(token(&ex.provider), &ex.tx_id)
        .expect("confirm");

    let err = ex
        .service
        .submit_rating(token(&ex.requester), &ex.tx_id, score, None)
        .expect_err("score out of range");
    assert_eq!(err.code(), "invalid_input");
}

#[test]
fn ratings_feed_reputation() {
    let ex = started_exchange(30);
    ex.service
        .confirm_completion(token(&ex.requester), &ex.tx_id)
        .expect("confirm");
    ex.service
        .confirm_completion(token(&ex.provider), &ex.tx_id)
        .expect("confirm");

    ex.service
        .submit_rating(token(&ex.requester), &ex.tx_id, 4, Some("patient".into()))
        .expect("rate provider");
    ex.service
        .submit_rating(token(&ex.provider), &ex.tx_id, 5, None)
        .expect("rate requester");

    let provider = ex
        .service
        .reputation(token(&ex.requester), &ex.provider.user.id)
        .expect("reputation");
    assert_eq!(provider.as_provider.as_ref().map(|r| r.count), Some(1));
    assert_eq!(provider.provider_average(), Some(4.0));
}

#[test]
fn mark_all_read_clears_unread() {
    let ex = started_exchange(30);
    let notes = ex
        .service
        .notifications(token(&ex.provider), false)
        .expect("notifications");
    assert!(notes.iter().any(|n| n.kind == NotificationKind::MatchSuggested));
    assert!(ex.service.unread_count(token(&ex.provider)).expect("unread") > 0);

    let marked = ex.service.mark_all_read(token(&ex.provider)).expect("mark");
    assert_eq!(marked, notes.len());
    assert_eq!(ex.service.unread_count(token(&ex.provider)).expect("unread"), 0);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let user_id = {
        let service = SkillSwap::open(dir.path()).expect("open");
        let ada = register(&service, "Ada");
        service.add_skill(token(&ada), guitar_skill()).expect("skill");
        ada.user.id
    };

    let service = SkillSwap::open(dir.path()).expect("reopen");
    let ada = service.login("ada@example.com", "password123").expect("login");
    assert_eq!(ada.user.id, user_id);
    assert_eq!(service.balance(token(&ada)).expect("balance").credits, 100);
    assert_eq!(service.skills_of(token(&ada), &user_id).expect("skills").len(), 1);
}

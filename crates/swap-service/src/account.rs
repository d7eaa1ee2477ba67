//! Registration, login and the caller's own account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swap_auth::{AuthError, NewAccount, Password, Role, SessionToken, UserProfile};
use swap_core::{Credits, UserId};
use swap_ledger::CreditEntry;
use tracing::info;

use crate::database::Database;
use crate::error::Result;
use crate::facade::SkillSwap;

/// A freshly issued session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token to pass to later calls.
    pub token: SessionToken,
    /// When the token stops working.
    pub expires_at: DateTime<Utc>,
    /// The signed-in account.
    pub user: UserProfile,
}

/// The caller's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Cached balance on the account.
    pub credits: i64,
    /// Whether it agrees with the ledger.
    pub verified: bool,
}

impl SkillSwap {
    /// Creates an account with the starting credit grant and signs it in.
    ///
    /// # Errors
    ///
    /// Fails on an invalid email, display name or password, or a taken
    /// email.
    pub fn register(&self, email: &str, display_name: &str, password: &str) -> Result<AuthSession> {
        self.create_account(email, display_name, password, Role::User)
    }

    pub(crate) fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        role: Role,
    ) -> Result<AuthSession> {
        let password = Password::new(password);
        let initial = Credits::new(self.config().initial_credits);
        let min_password_length = self.config().min_password_length;
        let ttl = self.config().session_ttl()?;
        self.write(|db, now| {
            let user_id = db.users.register(
                &NewAccount {
                    email,
                    display_name,
                    password: &password,
                    min_password_length,
                    role,
                },
                now,
            )?;
            db.open_account(&user_id, initial, now)?;
            issue_session(db, &user_id, now, ttl)
        })
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or a wrong password,
    /// and `AccountSuspended` for suspended accounts.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let password = Password::new(password);
        let ttl = self.config().session_ttl()?;
        self.write(|db, now| {
            let user_id = db.users.authenticate(email, &password)?.id.clone();
            info!(user_id = %user_id, "signed in");
            issue_session(db, &user_id, now, ttl)
        })
    }

    /// Ends a session. Unknown tokens are ignored. Returns true if a session
    /// was deleted.
    ///
    /// # Errors
    ///
    /// Only fails if the change cannot be applied.
    pub fn logout(&self, token: &str) -> Result<bool> {
        self.write(|db, _| Ok(db.sessions.revoke(token)))
    }

    /// The caller's own account.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn whoami(&self, token: &str) -> Result<UserProfile> {
        self.read_as(token, |db, me, _| Ok(db.users.require(&me.user_id)?.profile()))
    }

    /// Another user's public profile.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or an unknown user.
    pub fn profile(&self, token: &str, user_id: &UserId) -> Result<UserProfile> {
        self.read_as(token, |db, _, _| Ok(db.users.require(user_id)?.profile()))
    }

    /// Changes the caller's display name and/or bio. `None` leaves a field
    /// alone; an empty bio clears it.
    ///
    /// # Errors
    ///
    /// Fails for an invalid session or display name.
    pub fn update_profile(
        &self,
        token: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<UserProfile> {
        self.write_as(token, |db, me, _| {
            db.users.update_profile(&me.user_id, display_name, bio)?;
            Ok(db.users.require(&me.user_id)?.profile())
        })
    }

    /// The caller's balance, checked against the ledger.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn balance(&self, token: &str) -> Result<Balance> {
        self.read_as(token, |db, me, _| {
            let credits = db.users.require(&me.user_id)?.credits;
            Ok(Balance {
                credits,
                verified: db.ledger.verify(&me.user_id, credits).is_ok(),
            })
        })
    }

    /// The caller's credit history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid session.
    pub fn credit_history(&self, token: &str, limit: Option<usize>) -> Result<Vec<CreditEntry>> {
        self.read_as(token, |db, me, _| {
            Ok(db
                .ledger
                .history(&me.user_id, limit)
                .into_iter()
                .cloned()
                .collect())
        })
    }
}

fn issue_session(
    db: &mut Database,
    user_id: &UserId,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Result<AuthSession> {
    let user = db
        .users
        .get(user_id)
        .filter(|u| u.is_active())
        .ok_or(AuthError::Unauthenticated)?
        .profile();
    let (token, session) = db.sessions.issue(user_id.clone(), now, ttl);
    Ok(AuthSession {
        token,
        expires_at: session.expires_at,
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use swap_ledger::EntryType;

    #[test]
    fn register_grants_starting_credits() {
        let service = SkillSwap::in_memory();
        let session = service
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        assert_eq!(session.user.credits, 100);
        assert_eq!(session.token.as_str().len(), 64);

        let balance = service.balance(session.token.as_str()).expect("balance");
        assert_eq!(balance, Balance { credits: 100, verified: true });

        let history = service.credit_history(session.token.as_str(), None).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].entry_type, EntryType::Initial);
    }

    #[test]
    fn login_errors_are_uniform() {
        let service = SkillSwap::in_memory();
        service
            .register("ada@example.com", "Ada", "password123")
            .expect("register");

        let wrong = service.login("ada@example.com", "wrong-password");
        let unknown = service.login("bob@example.com", "password123");
        assert!(matches!(wrong, Err(ServiceError::Auth(AuthError::InvalidCredentials))));
        assert!(matches!(unknown, Err(ServiceError::Auth(AuthError::InvalidCredentials))));
        assert!(service.login("ADA@example.com", "password123").is_ok());
    }

    #[test]
    fn duplicate_registration_fails_without_side_effects() {
        let service = SkillSwap::in_memory();
        service
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        let err = service.register("ada@example.com", "Ada Again", "password456");
        assert!(matches!(err, Err(ServiceError::Auth(AuthError::EmailTaken { .. }))));
    }

    #[test]
    fn logout_invalidates_token() {
        let service = SkillSwap::in_memory();
        let session = service
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        let token = session.token.as_str();

        assert!(service.logout(token).expect("logout"));
        assert!(!service.logout(token).expect("no-op"));
        assert!(matches!(
            service.whoami(token),
            Err(ServiceError::Auth(AuthError::Unauthenticated))
        ));
    }

    #[test]
    fn profile_updates() {
        let service = SkillSwap::in_memory();
        let session = service
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        let updated = service
            .update_profile(session.token.as_str(), Some("Ada L."), Some("Teaches maths"))
            .expect("update");
        assert_eq!(updated.display_name, "Ada L.");
        assert_eq!(updated.bio.as_deref(), Some("Teaches maths"));
    }
}

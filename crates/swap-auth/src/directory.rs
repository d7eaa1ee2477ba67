//! User directory.
//!
//! The [`UserDirectory`] owns every account and an email index. It knows
//! nothing about credits beyond the cached balance field; the ledger decides
//! the value and the caller patches it in with [`UserDirectory::set_credits`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swap_core::UserId;
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::password::Password;
use crate::session::SessionStore;
use crate::types::{Identity, Role, User, UserStatus, normalize_display_name, normalize_email};

/// Fields a new account is created from.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    /// Raw email as typed.
    pub email: &'a str,
    /// Raw display name as typed.
    pub display_name: &'a str,
    /// Plaintext password.
    pub password: &'a Password,
    /// Minimum accepted password length.
    pub min_password_length: usize,
    /// Role to grant.
    pub role: Role,
}

/// In-memory account table with an email index.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UserDirectory {
    users: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

impl UserDirectory {
    /// Creates a new empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account with a zero cached balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the email, name or password fail validation, or if
    /// the email is already registered.
    pub fn register(&mut self, account: &NewAccount<'_>, now: DateTime<Utc>) -> Result<UserId> {
        let email = normalize_email(account.email)?;
        let display_name = normalize_display_name(account.display_name)?;
        account.password.check_policy(account.min_password_length)?;
        if self.by_email.contains_key(&email) {
            return Err(AuthError::EmailTaken { email });
        }

        let user = User {
            id: UserId::new(),
            email: email.clone(),
            display_name,
            password_hash: account.password.hash()?,
            credits: 0,
            role: account.role,
            status: UserStatus::Active,
            bio: None,
            created_at: now,
        };
        let id = user.id.clone();
        self.by_email.insert(email, id.clone());
        self.users.insert(id.clone(), user);
        info!(user_id = %id, role = %account.role, "registered account");
        Ok(id)
    }

    /// Checks an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    /// password, and [`AuthError::AccountSuspended`] for suspended accounts.
    pub fn authenticate(&self, email: &str, password: &Password) -> Result<&User> {
        let normalized = email.trim().to_lowercase();
        let Some(user) = self.by_email.get(&normalized).and_then(|id| self.users.get(id)) else {
            warn!("login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !user.password_hash.verify(password) {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            warn!(user_id = %user.id, "login attempt on suspended account");
            return Err(AuthError::AccountSuspended {
                id: user.id.to_string(),
            });
        }
        Ok(user)
    }

    /// Gets an account by ID.
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Gets an account by email.
    #[must_use]
    pub fn get_by_email(&self, email: &str) -> Option<&User> {
        let normalized = email.trim().to_lowercase();
        self.by_email
            .get(&normalized)
            .and_then(|id| self.users.get(id))
    }

    /// Gets an account, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if absent.
    pub fn require(&self, id: &UserId) -> Result<&User> {
        self.users.get(id).ok_or_else(|| AuthError::UserNotFound {
            id: id.to_string(),
        })
    }

    fn require_mut(&mut self, id: &UserId) -> Result<&mut User> {
        self.users.get_mut(id).ok_or_else(|| AuthError::UserNotFound {
            id: id.to_string(),
        })
    }

    /// Patches the cached balance to match the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if absent.
    pub fn set_credits(&mut self, id: &UserId, balance: i64) -> Result<()> {
        let user = self.require_mut(id)?;
        debug!(user_id = %id, from = user.credits, to = balance, "patched cached balance");
        user.credits = balance;
        Ok(())
    }

    /// Changes the account status.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if absent.
    pub fn set_status(&mut self, id: &UserId, status: UserStatus) -> Result<()> {
        let user = self.require_mut(id)?;
        user.status = status;
        info!(user_id = %id, %status, "changed account status");
        Ok(())
    }

    /// Changes the account role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if absent.
    pub fn set_role(&mut self, id: &UserId, role: Role) -> Result<()> {
        let user = self.require_mut(id)?;
        user.role = role;
        info!(user_id = %id, %role, "changed account role");
        Ok(())
    }

    /// Updates profile fields. `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is absent or the name is invalid.
    pub fn update_profile(
        &mut self,
        id: &UserId,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<()> {
        let display_name = display_name.map(normalize_display_name).transpose()?;
        let user = self.require_mut(id)?;
        if let Some(name) = display_name {
            user.display_name = name;
        }
        if let Some(bio) = bio {
            let bio = bio.trim();
            user.bio = (!bio.is_empty()).then(|| bio.to_string());
        }
        Ok(())
    }

    /// Iterates over every account.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if there are no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Resolves a bearer token to the caller's identity.
///
/// The session must exist, must not be expired at `now`, and its user must
/// still be active.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] otherwise.
pub fn authenticate_session(
    directory: &UserDirectory,
    sessions: &SessionStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Identity> {
    let session = sessions
        .get_valid_at(token, now)
        .ok_or(AuthError::Unauthenticated)?;
    let user = directory
        .get(&session.user_id)
        .filter(|u| u.is_active())
        .ok_or(AuthError::Unauthenticated)?;
    Ok(Identity {
        user_id: user.id.clone(),
        role: user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account<'a>(email: &'a str, password: &'a Password) -> NewAccount<'a> {
        NewAccount {
            email,
            display_name: "Test User",
            password,
            min_password_length: 8,
            role: Role::User,
        }
    }

    #[test]
    fn register_and_authenticate() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("password123");
        let id = dir.register(&account("Ann@Example.com", &pw), Utc::now()).expect("register");

        let user = dir.authenticate("ann@example.com", &pw).expect("login");
        assert_eq!(user.id, id);
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.credits, 0);
        assert!(dir.get_by_email(" ANN@example.com").is_some());
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("password123");
        dir.register(&account("dup@example.com", &pw), Utc::now()).expect("register");
        let err = dir
            .register(&account("DUP@example.com", &pw), Utc::now())
            .expect_err("duplicate");
        assert!(matches!(err, AuthError::EmailTaken { .. }));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("password123");
        dir.register(&account("x@example.com", &pw), Utc::now()).expect("register");

        let wrong = dir.authenticate("x@example.com", &Password::new("nope-nope"));
        let unknown = dir.authenticate("y@example.com", &pw);
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn weak_password_is_rejected() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("short");
        let err = dir.register(&account("w@example.com", &pw), Utc::now()).expect_err("weak");
        assert!(matches!(err, AuthError::WeakPassword { .. }));
        assert!(dir.is_empty());
    }

    #[test]
    fn suspended_user_cannot_authenticate() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("password123");
        let id = dir.register(&account("s@example.com", &pw), Utc::now()).expect("register");
        dir.set_status(&id, UserStatus::Suspended).expect("suspend");

        let err = dir.authenticate("s@example.com", &pw).expect_err("suspended");
        assert!(matches!(err, AuthError::AccountSuspended { .. }));
    }

    #[test]
    fn session_resolution() {
        let mut dir = UserDirectory::new();
        let mut sessions = SessionStore::new();
        let pw = Password::new("password123");
        let id = dir.register(&account("r@example.com", &pw), Utc::now()).expect("register");
        let now = Utc::now();
        let (token, _) = sessions.issue(id.clone(), now, Duration::days(7));

        let identity = authenticate_session(&dir, &sessions, token.as_str(), now).expect("identity");
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.role, Role::User);

        let later = now + Duration::days(7);
        assert!(matches!(
            authenticate_session(&dir, &sessions, token.as_str(), later),
            Err(AuthError::Unauthenticated)
        ));

        dir.set_status(&id, UserStatus::Suspended).expect("suspend");
        assert!(matches!(
            authenticate_session(&dir, &sessions, token.as_str(), now),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn update_profile_fields() {
        let mut dir = UserDirectory::new();
        let pw = Password::new("password123");
        let id = dir.register(&account("p@example.com", &pw), Utc::now()).expect("register");

        dir.update_profile(&id, Some(" New Name "), Some("I fix bikes")).expect("update");
        let user = dir.get(&id).expect("user");
        assert_eq!(user.display_name, "New Name");
        assert_eq!(user.bio.as_deref(), Some("I fix bikes"));

        dir.update_profile(&id, None, Some("  ")).expect("clear bio");
        assert!(dir.get(&id).expect("user").bio.is_none());
        assert!(dir.update_profile(&id, Some(""), None).is_err());
    }
}

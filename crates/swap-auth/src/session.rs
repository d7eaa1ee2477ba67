//! Session tokens.
//!
//! This module provides:
//! - [`SessionToken`]: the opaque 64-character bearer string handed to clients
//! - [`TokenHash`]: blake3 hash of a token, the only form kept at rest
//! - [`Session`]: a session row with its absolute expiry
//! - [`SessionStore`]: in-memory session table
//!
//! Sessions never refresh or rotate. The expiry is fixed when the session is
//! issued at login or registration.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use swap_core::UserId;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a session token in characters.
pub const TOKEN_LENGTH: usize = 64;

/// Default absolute session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;

/// The plaintext bearer token, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a new random alphanumeric token.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token: String = (0..TOKEN_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..62u8);
                match idx {
                    0..=9 => (b'0' + idx) as char,
                    10..=35 => (b'a' + idx - 10) as char,
                    _ => (b'A' + idx - 36) as char,
                }
            })
            .collect();
        Self(token)
    }

    /// Wraps a token presented by a caller.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hashes this token for lookup.
    #[must_use]
    pub fn hash(&self) -> TokenHash {
        TokenHash::of(&self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible = if self.0.chars().count() > 8 {
            format!("{}...", self.0.chars().take(8).collect::<String>())
        } else {
            "[SHORT]".to_string()
        };
        f.debug_tuple("SessionToken").field(&visible).finish()
    }
}

/// Hex-encoded blake3 hash of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hashes a plaintext token.
    #[must_use]
    pub fn of(token: &str) -> Self {
        Self(blake3::hash(token.as_bytes()).to_hex().to_string())
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Hash of the bearer token.
    pub token_hash: TokenHash,
    /// Owner of the session.
    pub user_id: UserId,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session table keyed by token hash.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionStore {
    sessions: HashMap<TokenHash, Session>,
}

impl SessionStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a session for `user_id` valid for `ttl` from `now`.
    ///
    /// Returns the plaintext token; only its hash is stored.
    pub fn issue(&mut self, user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> (SessionToken, Session) {
        let token = SessionToken::generate();
        let session = Session {
            token_hash: token.hash(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        self.sessions
            .insert(session.token_hash.clone(), session.clone());
        (token, session)
    }

    /// Looks up the session for a plaintext token, expired or not.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(&TokenHash::of(token))
    }

    /// Looks up a session that is still valid at `now`.
    #[must_use]
    pub fn get_valid_at(&self, token: &str, now: DateTime<Utc>) -> Option<&Session> {
        self.get(token).filter(|s| !s.is_expired_at(now))
    }

    /// Deletes the session for a token. Returns true if one existed.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&TokenHash::of(token)).is_some()
    }

    /// Deletes every session belonging to `user_id`. Returns how many were removed.
    pub fn revoke_all_for_user(&mut self, user_id: &UserId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| &s.user_id != user_id);
        before - self.sessions.len()
    }

    /// Removes sessions expired at `now`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        before - self.sessions.len()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_shows_only_a_prefix() {
        let token = SessionToken::from_string("abcdefghijklmnop");
        let shown = format!("{token:?}");
        assert!(shown.contains("abcdefgh..."));
        assert!(!shown.contains("ijkl"));

        let wide = SessionToken::from_string("ééééééééééé");
        assert!(format!("{wide:?}").contains("éééééééé..."));
        assert!(format!("{:?}", SessionToken::from_string("short")).contains("[SHORT]"));
    }

    #[test]
    fn token_is_64_alphanumeric_chars() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, SessionToken::generate());
    }

    #[test]
    fn token_debug_is_truncated() {
        let token = SessionToken::generate();
        let debug = format!("{token:?}");
        assert!(debug.contains("..."));
        assert!(!debug.contains(token.as_str()));
    }

    #[test]
    fn token_hash_is_stable() {
        assert_eq!(TokenHash::of("abc"), TokenHash::of("abc"));
        assert_ne!(TokenHash::of("abc"), TokenHash::of("abd"));
        assert_eq!(TokenHash::of("abc").as_str().len(), 64);
    }

    #[test]
    fn issue_and_lookup() {
        let mut store = SessionStore::new();
        let user = UserId::new();
        let now = Utc::now();
        let (token, session) = store.issue(user.clone(), now, Duration::hours(DEFAULT_SESSION_TTL_HOURS));

        assert_eq!(session.expires_at - session.created_at, Duration::days(7));
        let found = store.get_valid_at(token.as_str(), now).expect("session");
        assert_eq!(found.user_id, user);
        assert!(store.get("not-a-token").is_none());
    }

    #[test]
    fn expiry_is_absolute() {
        let mut store = SessionStore::new();
        let now = Utc::now();
        let (token, _) = store.issue(UserId::new(), now, Duration::hours(1));

        assert!(store.get_valid_at(token.as_str(), now + Duration::minutes(59)).is_some());
        assert!(store.get_valid_at(token.as_str(), now + Duration::hours(1)).is_none());
        // Still stored until purged.
        assert!(store.get(token.as_str()).is_some());

        assert_eq!(store.purge_expired(now + Duration::hours(2)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn revoke_single_and_all() {
        let mut store = SessionStore::new();
        let user = UserId::new();
        let other = UserId::new();
        let now = Utc::now();
        let ttl = Duration::hours(1);
        let (a, _) = store.issue(user.clone(), now, ttl);
        let (_b, _) = store.issue(user.clone(), now, ttl);
        let (c, _) = store.issue(other, now, ttl);

        assert!(store.revoke(a.as_str()));
        assert!(!store.revoke(a.as_str()));
        assert_eq!(store.revoke_all_for_user(&user), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(c.as_str()).is_some());
    }
}

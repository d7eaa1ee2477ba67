//! The [`SkillSwap`] facade: construction, locking and persistence.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::Path;
use swap_auth::{Identity, authenticate_session};
use swap_persist::JsonStore;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ServiceConfig;
use crate::database::{DATABASE_FILE, Database};
use crate::error::Result;

/// The SkillSwap service.
///
/// Owns the whole [`Database`] behind one lock. Every mutating operation
/// holds the write lock for its full duration, runs against a scratch copy,
/// and only replaces the live state when it succeeds. With a backing
/// [`JsonStore`] the state is snapshotted after each successful mutation.
#[derive(Debug)]
pub struct SkillSwap {
    db: RwLock<Database>,
    store: Option<JsonStore>,
    config: ServiceConfig,
    clock: Clock,
}

impl SkillSwap {
    /// A service with no persistence and default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// A service with no persistence.
    #[must_use]
    pub fn with_config(config: ServiceConfig) -> Self {
        Self {
            db: RwLock::new(Database::default()),
            store: None,
            config,
            clock: Clock::System,
        }
    }

    /// Opens (or creates) a persisted service in `dir`, reading
    /// `config.json` if present.
    ///
    /// # Errors
    ///
    /// Fails if the configuration or the snapshot cannot be read.
    pub fn open(dir: &Path) -> Result<Self> {
        let config = ServiceConfig::load(dir)?;
        Self::open_with_config(dir, config)
    }

    /// Opens (or creates) a persisted service in `dir` with an explicit
    /// configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the snapshot cannot be read.
    pub fn open_with_config(dir: &Path, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let store = JsonStore::new(dir, DATABASE_FILE);
        let db: Database = store.try_load()?.unwrap_or_default();
        info!(
            path = %store.path().display(),
            users = db.users.len(),
            "opened skillswap state"
        );
        Ok(Self {
            db: RwLock::new(db),
            store: Some(store),
            config,
            clock: Clock::System,
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Current time according to the service clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs a read-only query.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Database, DateTime<Utc>) -> Result<T>) -> Result<T> {
        let db = self.db.read();
        f(&db, self.clock.now())
    }

    /// Runs a read-only query as an authenticated caller.
    pub(crate) fn read_as<T>(
        &self,
        token: &str,
        f: impl FnOnce(&Database, &Identity, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        self.read(|db, now| {
            let identity = authenticate_session(&db.users, &db.sessions, token, now)?;
            f(db, &identity, now)
        })
    }

    /// Runs a mutation. Changes are discarded if `f` fails.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Database, DateTime<Utc>) -> Result<T>) -> Result<T> {
        let mut db = self.db.write();
        let now = self.clock.now();
        let mut scratch = db.clone();
        let value = f(&mut scratch, now)?;
        *db = scratch;
        self.snapshot(&db);
        Ok(value)
    }

    /// Runs a mutation as an authenticated caller.
    pub(crate) fn write_as<T>(
        &self,
        token: &str,
        f: impl FnOnce(&mut Database, &Identity, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        self.write(|db, now| {
            let identity = authenticate_session(&db.users, &db.sessions, token, now)?;
            f(db, &identity, now)
        })
    }

    /// Runs a mutation as an administrator.
    pub(crate) fn write_as_admin<T>(
        &self,
        token: &str,
        f: impl FnOnce(&mut Database, &Identity, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        self.write_as(token, |db, identity, now| {
            identity.require_admin()?;
            f(db, identity, now)
        })
    }

    fn snapshot(&self, db: &Database) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(db) {
            warn!(error = %e, "failed to snapshot skillswap state");
        } else {
            debug!("snapshotted skillswap state");
        }
    }

    /// Resolves a token to the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the session is unknown, expired, or its
    /// user is suspended.
    pub fn validate_session(&self, token: &str) -> Result<Identity> {
        self.validate_session_at(token, self.clock.now())
    }

    /// Resolves a token to the caller's identity at a given instant.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the session is unknown, expired at
    /// `now`, or its user is suspended.
    pub fn validate_session_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity> {
        let db = self.db.read();
        Ok(authenticate_session(&db.users, &db.sessions, token, now)?)
    }

    /// Deletes sessions expired at `now`. Returns how many were removed.
    pub fn purge_expired_sessions_at(&self, now: DateTime<Utc>) -> usize {
        let mut db = self.db.write();
        let purged = db.sessions.purge_expired(now);
        if purged > 0 {
            info!(purged, "purged expired sessions");
            self.snapshot(&db);
        }
        purged
    }

    /// Expires pending proposals past their deadline at `now`. Returns how
    /// many changed.
    pub fn expire_negotiations_at(&self, now: DateTime<Utc>) -> usize {
        let mut db = self.db.write();
        let expired = db.negotiations.expire_stale(now);
        if expired > 0 {
            self.snapshot(&db);
        }
        expired
    }
}

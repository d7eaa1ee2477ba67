//! Service configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;
use swap_auth::DEFAULT_SESSION_TTL_HOURS;
use swap_market::DEFAULT_NEGOTIATION_TTL_HOURS;
use swap_persist::JsonStore;
use tracing::debug;

use crate::error::{Result, ServiceError};

/// Name of the configuration snapshot inside the state directory.
pub const CONFIG_FILE: &str = "config";

/// Longest session or proposal lifetime accepted, ten years.
pub const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

/// Tunables for a [`SkillSwap`](crate::SkillSwap) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Credits granted at registration.
    pub initial_credits: u64,
    /// Absolute session lifetime.
    pub session_ttl_hours: i64,
    /// Lifetime of a proposal before it expires.
    pub negotiation_ttl_hours: i64,
    /// Minimum password length.
    pub min_password_length: usize,
    /// Default cap on suggestions per call.
    pub max_suggestions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            initial_credits: 100,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            negotiation_ttl_hours: DEFAULT_NEGOTIATION_TTL_HOURS,
            min_password_length: 8,
            max_suggestions: 5,
        }
    }
}

impl ServiceConfig {
    /// Loads `config.json` from `dir`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be parsed, or holds invalid values.
    pub fn load(dir: &Path) -> Result<Self> {
        let store = JsonStore::new(dir, CONFIG_FILE);
        let config: Self = store.try_load()?.unwrap_or_default();
        config.validate()?;
        debug!(path = %store.path().display(), "loaded configuration");
        Ok(config)
    }

    /// Writes the configuration to `config.json` in `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot cannot be written.
    pub fn save(&self, dir: &Path) -> Result<()> {
        JsonStore::new(dir, CONFIG_FILE).save(self)?;
        Ok(())
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.session_ttl()?;
        self.negotiation_ttl()?;
        let reason = if self.min_password_length == 0 {
            "min_password_length must be positive"
        } else if self.max_suggestions == 0 {
            "max_suggestions must be positive"
        } else if i64::try_from(self.initial_credits).is_err() {
            "initial_credits is too large"
        } else {
            return Ok(());
        };
        Err(ServiceError::Config {
            reason: reason.to_string(),
        })
    }

    /// Session lifetime as a duration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] unless `session_ttl_hours` is within
    /// `1..=MAX_TTL_HOURS`.
    pub fn session_ttl(&self) -> Result<Duration> {
        ttl_hours(self.session_ttl_hours, "session_ttl_hours")
    }

    /// Proposal lifetime as a duration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] unless `negotiation_ttl_hours` is
    /// within `1..=MAX_TTL_HOURS`.
    pub fn negotiation_ttl(&self) -> Result<Duration> {
        ttl_hours(self.negotiation_ttl_hours, "negotiation_ttl_hours")
    }
}

fn ttl_hours(hours: i64, name: &str) -> Result<Duration> {
    if !(1..=MAX_TTL_HOURS).contains(&hours) {
        return Err(ServiceError::Config {
            reason: format!("{name} must be between 1 and {MAX_TTL_HOURS}"),
        });
    }
    Duration::try_hours(hours).ok_or_else(|| ServiceError::Config {
        reason: format!("{name} is out of range"),
    })
}

//! Shared state for command handlers: the opened service and the caller's
//! session token.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use swap_persist::JsonStore;
use swap_service::{ServiceConfig, SkillSwap};
use tracing::debug;

use crate::error::CliError;

/// Name of the saved-session file inside the state directory.
pub const SESSION_FILE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    token: String,
}

/// Everything a command needs to run.
#[derive(Debug)]
pub struct Context {
    service: SkillSwap,
    state_dir: PathBuf,
    token: Option<String>,
}

impl Context {
    /// Opens the service in `state_dir`. An explicit token wins over the
    /// saved session.
    ///
    /// # Errors
    ///
    /// Fails if the state or the saved session cannot be read.
    pub fn open(state_dir: &Path, token: Option<String>) -> Result<Self, CliError> {
        let config = ServiceConfig::load(state_dir)?;
        Self::open_with_config(state_dir, token, config)
    }

    /// Like [`Context::open`], with an already merged configuration.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid or the state cannot be read.
    pub fn open_with_config(
        state_dir: &Path,
        token: Option<String>,
        config: ServiceConfig,
    ) -> Result<Self, CliError> {
        let service = SkillSwap::open_with_config(state_dir, config)?;
        let token = match token {
            Some(t) => Some(t),
            None => session_store(state_dir)
                .try_load::<SavedSession>()?
                .map(|s| s.token),
        };
        Ok(Self {
            service,
            state_dir: state_dir.to_path_buf(),
            token,
        })
    }

    /// The opened service.
    #[must_use]
    pub const fn service(&self) -> &SkillSwap {
        &self.service
    }

    /// The caller's token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotLoggedIn`] if there is none.
    pub fn token(&self) -> Result<&str, CliError> {
        self.token.as_deref().ok_or(CliError::NotLoggedIn)
    }

    /// Remembers a token for later invocations.
    ///
    /// # Errors
    ///
    /// Fails if the session file cannot be written.
    pub fn save_session(&self, token: &str) -> Result<(), CliError> {
        session_store(&self.state_dir).save(&SavedSession {
            token: token.to_string(),
        })?;
        debug!("saved session");
        Ok(())
    }

    /// Forgets the saved token.
    ///
    /// # Errors
    ///
    /// Fails if the session file cannot be removed.
    pub fn clear_session(&self) -> Result<(), CliError> {
        session_store(&self.state_dir).remove()?;
        Ok(())
    }
}

fn session_store(state_dir: &Path) -> JsonStore {
    JsonStore::new(state_dir, SESSION_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_falls_back_to_saved_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        assert!(matches!(ctx.token(), Err(CliError::NotLoggedIn)));

        ctx.save_session("abc").expect("save");
        let reopened = Context::open(dir.path(), None).expect("reopen");
        assert_eq!(reopened.token().expect("token"), "abc");

        let explicit = Context::open(dir.path(), Some("xyz".to_string())).expect("explicit");
        assert_eq!(explicit.token().expect("token"), "xyz");

        reopened.clear_session().expect("clear");
        let cleared = Context::open(dir.path(), None).expect("cleared");
        assert!(cleared.token().is_err());
    }

    #[test]
    fn explicit_config_is_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServiceConfig {
            session_ttl_hours: 0,
            ..ServiceConfig::default()
        };
        let err = Context::open_with_config(dir.path(), None, config).expect_err("invalid ttl");
        assert_eq!(err.code(), "config");
    }
}

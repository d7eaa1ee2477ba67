//! Authentication command implementation.
//!
//! Handles registration, login, logout, whoami and profile edits. A
//! successful login saves the session so later invocations need no token.

use std::io::Write;

use crate::cli::AuthCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Ack, OutputFormat};

/// Handler for auth subcommands.
pub struct AuthCommand<'a> {
    ctx: &'a Context,
}

impl<'a> AuthCommand<'a> {
    /// Creates a new auth command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the auth subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AuthCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        match command {
            AuthCommands::Register {
                email,
                name,
                password,
            } => {
                let session = service.register(email, name, password)?;
                self.ctx.save_session(session.token.as_str())?;
                format.write(out, &session)
            }
            AuthCommands::Login { email, password } => {
                let session = service.login(email, password)?;
                self.ctx.save_session(session.token.as_str())?;
                format.write(out, &session)
            }
            AuthCommands::Logout => {
                let ended = match self.ctx.token() {
                    Ok(token) => service.logout(token)?,
                    Err(_) => false,
                };
                self.ctx.clear_session()?;
                let message = if ended { "Logged out" } else { "No active session" };
                format.write(out, &Ack::new(message))
            }
            AuthCommands::Whoami => format.write(out, &service.whoami(self.ctx.token()?)?),
            AuthCommands::Profile { user } => {
                format.write(out, &service.profile(self.ctx.token()?, user)?)
            }
            AuthCommands::Update { name, bio } => {
                if name.is_none() && bio.is_none() {
                    return Err(CliError::InvalidArgument(
                        "pass --name and/or --bio".to_string(),
                    ));
                }
                let profile =
                    service.update_profile(self.ctx.token()?, name.as_deref(), bio.as_deref())?;
                format.write(out, &profile)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    fn run(ctx: &Context, command: &AuthCommands) -> Result<String, CliError> {
        let mut out = Vec::new();
        AuthCommand::new(ctx).execute(&mut out, &OutputFormat::new(Format::Table), command)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn register_saves_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        let output = run(
            &ctx,
            &AuthCommands::Register {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                password: "password123".into(),
            },
        )
        .expect("register");
        assert!(output.contains("Signed in as Ada"));

        let reopened = Context::open(dir.path(), None).expect("reopen");
        let whoami = run(&reopened, &AuthCommands::Whoami).expect("whoami");
        assert!(whoami.contains("ada@example.com"));
    }

    #[test]
    fn update_needs_a_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), Some("unused".into())).expect("open");
        let err = run(&ctx, &AuthCommands::Update { name: None, bio: None });
        assert!(matches!(err, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn logout_without_session_is_harmless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        let output = run(&ctx, &AuthCommands::Logout).expect("logout");
        assert!(output.contains("No active session"));
    }
}

//! Rating, reputation and notification commands.

use std::io::Write;

use crate::cli::{NotifyCommands, RateArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Ack, OutputFormat, ReputationView};
use swap_core::UserId;

/// Handler for `rate`.
pub struct RateCommand<'a> {
    ctx: &'a Context,
}

impl<'a> RateCommand<'a> {
    /// Creates a new rate command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Submits the rating.
    ///
    /// # Errors
    ///
    /// Returns error if the rating is refused.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &RateArgs,
    ) -> Result<(), CliError> {
        let rating = self.ctx.service().submit_rating(
            self.ctx.token()?,
            &args.transaction,
            args.score,
            args.comment.clone(),
        )?;
        format.write(out, &rating)
    }
}

/// Handler for `reputation`.
pub struct ReputationCommand<'a> {
    ctx: &'a Context,
}

impl<'a> ReputationCommand<'a> {
    /// Creates a new reputation command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Shows the reputation of `user`, or of the caller.
    ///
    /// # Errors
    ///
    /// Returns error if the user is unknown.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        user: Option<&UserId>,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        let user_id = match user {
            Some(user) => user.clone(),
            None => service.validate_session(token)?.user_id,
        };
        let view = ReputationView {
            reputation: service.reputation(token, &user_id)?,
            ratings: service.ratings_for(token, &user_id)?,
        };
        format.write(out, &view)
    }
}

/// Handler for notification subcommands.
pub struct NotifyCommand<'a> {
    ctx: &'a Context,
}

impl<'a> NotifyCommand<'a> {
    /// Creates a new notification command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the notification subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &NotifyCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            NotifyCommands::List { unread } => {
                format.write(out, &service.notifications(token, *unread)?)
            }
            NotifyCommands::Read { id } => {
                service.mark_read(token, id)?;
                format.write(out, &Ack::new(format!("Marked {id} read")))
            }
            NotifyCommands::ReadAll => {
                let count = service.mark_all_read(token)?;
                format.write(out, &Ack::counted("Marked notifications read", count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn reputation_defaults_to_caller() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        let session = ctx
            .service()
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        ctx.save_session(session.token.as_str()).expect("save");
        let ctx = Context::open(dir.path(), None).expect("reopen");

        let mut out = Vec::new();
        ReputationCommand::new(&ctx)
            .execute(&mut out, &OutputFormat::new(Format::Json), None)
            .expect("reputation");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["reputation"]["user_id"], session.user.id.to_string());
        assert_eq!(value["data"]["ratings"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn notifications_need_a_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        let mut out = Vec::new();
        let err = NotifyCommand::new(&ctx).execute(
            &mut out,
            &OutputFormat::default(),
            &NotifyCommands::ReadAll,
        );
        assert!(matches!(err, Err(CliError::NotLoggedIn)));
    }
}

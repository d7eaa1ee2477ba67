//! Administrator command implementation.
//!
//! `bootstrap` is the only subcommand that works without a session; it
//! refuses once any administrator exists.

use std::io::Write;

use crate::cli::AdminCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for admin subcommands.
pub struct AdminCommand<'a> {
    ctx: &'a Context,
}

impl<'a> AdminCommand<'a> {
    /// Creates a new admin command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the admin subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the caller is not an administrator or the command
    /// fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AdminCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        if let AdminCommands::Bootstrap {
            email,
            name,
            password,
        } = command
        {
            let session = service.bootstrap_admin(email, name, password)?;
            self.ctx.save_session(session.token.as_str())?;
            return format.write(out, &session);
        }

        let token = self.ctx.token()?;
        match command {
            AdminCommands::Bootstrap { .. } => Ok(()),
            AdminCommands::Users => format.write(out, &service.list_users(token)?),
            AdminCommands::Suspend { user } => format.write(out, &service.suspend_user(token, user)?),
            AdminCommands::Reactivate { user } => {
                format.write(out, &service.reactivate_user(token, user)?)
            }
            AdminCommands::Promote { user } => {
                format.write(out, &service.promote_to_admin(token, user)?)
            }
            AdminCommands::Adjust {
                user,
                amount,
                reason,
            } => format.write(out, &service.adjust_credits(token, user, *amount, reason)?),
            AdminCommands::Disputes => format.write(out, &service.disputed_transactions(token)?),
            AdminCommands::Resolve { id, resolution } => {
                format.write(out, &service.resolve_dispute(token, id, (*resolution).into())?)
            }
            AdminCommands::Reverse { id } => {
                format.write(out, &service.reverse_transaction(token, id)?)
            }
            AdminCommands::Reconcile => format.write(out, &service.reconcile_balances(token)?),
            AdminCommands::Sweep => format.write(out, &service.admin_sweep(token)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    fn bootstrap() -> AdminCommands {
        AdminCommands::Bootstrap {
            email: "root@example.com".into(),
            name: "Root".into(),
            password: "password123".into(),
        }
    }

    #[test]
    fn bootstrap_signs_in_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let format = OutputFormat::new(Format::Table);
        let ctx = Context::open(dir.path(), None).expect("open");
        AdminCommand::new(&ctx)
            .execute(&mut Vec::new(), &format, &bootstrap())
            .expect("bootstrap");

        let ctx = Context::open(dir.path(), None).expect("reopen");
        let mut out = Vec::new();
        AdminCommand::new(&ctx)
            .execute(&mut out, &format, &AdminCommands::Users)
            .expect("users");
        assert!(String::from_utf8_lossy(&out).contains("root@example.com"));

        let again = AdminCommand::new(&ctx).execute(&mut Vec::new(), &format, &bootstrap());
        assert_eq!(again.map_err(|e| e.code()), Err("forbidden"));
    }

    #[test]
    fn members_cannot_list_users() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = Context::open(dir.path(), None).expect("open");
        let session = ctx
            .service()
            .register("ada@example.com", "Ada", "password123")
            .expect("register");
        let ctx = Context::open(dir.path(), Some(session.token.as_str().to_string())).expect("reopen");
        let err = AdminCommand::new(&ctx).execute(
            &mut Vec::new(),
            &OutputFormat::default(),
            &AdminCommands::Users,
        );
        assert_eq!(err.map_err(|e| e.code()), Err("forbidden"));
    }
}

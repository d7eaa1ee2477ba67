//! Credits command implementation.

use std::io::Write;

use crate::cli::CreditsCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for credits subcommands.
pub struct CreditsCommand<'a> {
    ctx: &'a Context,
}

impl<'a> CreditsCommand<'a> {
    /// Creates a new credits command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the credits subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &CreditsCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            CreditsCommands::Balance => format.write(out, &service.balance(token)?),
            CreditsCommands::History { limit } => {
                format.write(out, &service.credit_history(token, *limit)?)
            }
        }
    }
}

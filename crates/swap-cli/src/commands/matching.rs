//! Match command implementation.

use std::io::Write;

use crate::cli::MatchCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for match subcommands.
pub struct MatchCommand<'a> {
    ctx: &'a Context,
}

impl<'a> MatchCommand<'a> {
    /// Creates a new match command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the match subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &MatchCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            MatchCommands::Suggest { request, limit } => {
                format.write(out, &service.suggest_matches(token, request, *limit)?)
            }
            MatchCommands::List { request } => {
                format.write(out, &service.matches_for_request(token, request)?)
            }
            MatchCommands::Mine => format.write(out, &service.my_suggestions(token)?),
            MatchCommands::Accept { id } => format.write(out, &service.accept_match(token, id)?),
            MatchCommands::Reject { id } => format.write(out, &service.reject_match(token, id)?),
        }
    }
}

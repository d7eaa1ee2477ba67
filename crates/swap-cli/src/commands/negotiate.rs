//! Negotiation command implementation.

use std::io::Write;

use crate::cli::NegotiateCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for negotiation subcommands.
pub struct NegotiateCommand<'a> {
    ctx: &'a Context,
}

impl<'a> NegotiateCommand<'a> {
    /// Creates a new negotiation command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the negotiation subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &NegotiateCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            NegotiateCommands::Propose { match_id, terms } => {
                let terms = terms.to_terms().ok_or_else(|| {
                    CliError::InvalidArgument("pass --credits or --swap".to_string())
                })?;
                format.write(out, &service.propose_terms(token, match_id, terms)?)
            }
            NegotiateCommands::Accept { id } => {
                format.write(out, &service.respond_to_negotiation(token, id, true)?)
            }
            NegotiateCommands::Reject { id } => {
                format.write(out, &service.respond_to_negotiation(token, id, false)?)
            }
            NegotiateCommands::List { match_id } => {
                format.write(out, &service.negotiations_for_match(token, match_id)?)
            }
        }
    }
}

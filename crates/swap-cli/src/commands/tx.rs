//! Transaction command implementation.

use std::io::Write;

use crate::cli::TxCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for transaction subcommands.
pub struct TxCommand<'a> {
    ctx: &'a Context,
}

impl<'a> TxCommand<'a> {
    /// Creates a new transaction command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the transaction subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &TxCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        let tx = match command {
            TxCommands::Create { match_id } => service.create_transaction(token, match_id)?,
            TxCommands::Show { id } => service.transaction(token, id)?,
            TxCommands::List => return format.write(out, &service.my_transactions(token)?),
            TxCommands::Start { id } => service.start_transaction(token, id)?,
            TxCommands::Confirm { id } => service.confirm_completion(token, id)?,
            TxCommands::Cancel { id } => service.cancel_transaction(token, id)?,
            TxCommands::Dispute {
                id,
                reason,
                evidence,
            } => service.dispute_transaction(token, id, reason, evidence.clone())?,
        };
        format.write(out, &tx)
    }
}

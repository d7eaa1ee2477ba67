//! Service request command implementation.

use std::io::Write;

use swap_market::NewRequest;

use crate::cli::RequestCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Handler for request subcommands.
pub struct RequestCommand<'a> {
    ctx: &'a Context,
}

impl<'a> RequestCommand<'a> {
    /// Creates a new request command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the request subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &RequestCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            RequestCommands::Create(args) => {
                let terms = args.terms.to_terms().ok_or_else(|| {
                    CliError::InvalidArgument("pass --credits or --swap".to_string())
                })?;
                let request = service.create_request(
                    token,
                    NewRequest {
                        title: args.title.clone(),
                        description: args.description.clone(),
                        category: args.category.clone(),
                        terms,
                    },
                )?;
                format.write(out, &request)
            }
            RequestCommands::Cancel { id } => format.write(out, &service.cancel_request(token, id)?),
            RequestCommands::Show { id } => format.write(out, &service.request(token, id)?),
            RequestCommands::List { category } => {
                format.write(out, &service.open_requests(token, category.as_deref())?)
            }
            RequestCommands::Mine => format.write(out, &service.my_requests(token)?),
        }
    }
}

//! Skill command implementation.

use std::io::Write;

use swap_market::NewSkill;

use crate::cli::{AddSkillArgs, SkillCommands};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Ack, OutputFormat};

/// Handler for skill subcommands.
pub struct SkillCommand<'a> {
    ctx: &'a Context,
}

impl<'a> SkillCommand<'a> {
    /// Creates a new skill command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the skill subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &SkillCommands,
    ) -> Result<(), CliError> {
        let service = self.ctx.service();
        let token = self.ctx.token()?;
        match command {
            SkillCommands::Add(args) => format.write(out, &service.add_skill(token, new_skill(args))?),
            SkillCommands::Remove { id } => {
                let removed = service.remove_skill(token, id)?;
                format.write(out, &Ack::new(format!("Removed skill {}", removed.name)))
            }
            SkillCommands::Attach { id, attachment } => {
                format.write(out, &service.attach_portfolio(token, id, attachment.clone())?)
            }
            SkillCommands::List { user } => {
                let owner = match user {
                    Some(user) => user.clone(),
                    None => service.validate_session(token)?.user_id,
                };
                format.write(out, &service.skills_of(token, &owner)?)
            }
        }
    }
}

fn new_skill(args: &AddSkillArgs) -> NewSkill {
    NewSkill {
        name: args.name.clone(),
        category: args.category.clone(),
        level: args.level.into(),
        hourly_rate: args.rate,
        description: args.description.clone(),
        portfolio: Vec::new(),
    }
}

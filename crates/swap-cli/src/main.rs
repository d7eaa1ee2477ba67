//! SkillSwap CLI binary entrypoint.
//!
//! This is the main entry point for the `skillswap` command-line tool.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use swap_cli::cli::{Cli, Commands};
use swap_cli::commands::{
    AdminCommand, AuthCommand, CreditsCommand, MatchCommand, NegotiateCommand, NotifyCommand,
    RateCommand, RequestCommand, ReputationCommand, SkillCommand, TxCommand,
};
use swap_cli::output::OutputFormat;
use swap_cli::{CliError, Context};
use swap_service::ServiceConfig;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match run(cli, &mut stdout, &format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Scripts read the envelope; people read stderr.
            let _ = format.write_error(&mut stdout, &e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run<W: Write>(cli: Cli, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
    let config = cli.config.apply(ServiceConfig::load(&cli.state_dir)?);
    let ctx = Context::open_with_config(&cli.state_dir, cli.token, config)?;

    match cli.command {
        Commands::Auth { command } => {
            AuthCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Skill { command } => {
            SkillCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Request { command } => {
            RequestCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Match { command } => {
            MatchCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Negotiate { command } => {
            NegotiateCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Tx { command } => {
            TxCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Rate(args) => {
            RateCommand::new(&ctx).execute(out, format, &args)?;
        }
        Commands::Reputation { user } => {
            ReputationCommand::new(&ctx).execute(out, format, user.as_ref())?;
        }
        Commands::Credits { command } => {
            CreditsCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Notify { command } => {
            NotifyCommand::new(&ctx).execute(out, format, &command)?;
        }
        Commands::Admin { command } => {
            AdminCommand::new(&ctx).execute(out, format, &command)?;
        }
    }

    out.flush()?;
    Ok(())
}

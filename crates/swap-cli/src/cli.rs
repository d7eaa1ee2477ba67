//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use swap_core::{
    AttachmentId, Credits, MatchId, NegotiationId, NotificationId, RequestId, SkillId,
    TransactionId, UserId,
};
use swap_market::{ExchangeTerms, Resolution, SkillLevel};
use swap_service::ServiceConfig;

/// SkillSwap - trade skills for credits or for other skills.
#[derive(Parser, Debug, Clone)]
#[command(name = "skillswap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the SkillSwap state.
    #[arg(short, long, env = "SKILLSWAP_STATE_DIR", default_value = ".skillswap")]
    pub state_dir: PathBuf,

    /// Session token. Defaults to the one saved by `auth login`.
    #[arg(short, long, env = "SKILLSWAP_TOKEN")]
    pub token: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Overrides for values in `config.json`.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Service tunables settable per invocation. Each one wins over the
/// matching field of the state directory's `config.json`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Credits granted at registration.
    #[arg(long, global = true, env = "SKILLSWAP_INITIAL_CREDITS")]
    pub initial_credits: Option<u64>,

    /// Session lifetime in hours.
    #[arg(long, global = true, env = "SKILLSWAP_SESSION_TTL_HOURS")]
    pub session_ttl_hours: Option<i64>,

    /// Proposal lifetime in hours.
    #[arg(long, global = true, env = "SKILLSWAP_NEGOTIATION_TTL_HOURS")]
    pub negotiation_ttl_hours: Option<i64>,

    /// Minimum password length.
    #[arg(long, global = true, env = "SKILLSWAP_MIN_PASSWORD_LENGTH")]
    pub min_password_length: Option<usize>,

    /// Default cap on suggestions per call.
    #[arg(long, global = true, env = "SKILLSWAP_MAX_SUGGESTIONS")]
    pub max_suggestions: Option<usize>,
}

impl ConfigArgs {
    /// Layers the given overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(v) = self.initial_credits {
            config.initial_credits = v;
        }
        if let Some(v) = self.session_ttl_hours {
            config.session_ttl_hours = v;
        }
        if let Some(v) = self.negotiation_ttl_hours {
            config.negotiation_ttl_hours = v;
        }
        if let Some(v) = self.min_password_length {
            config.min_password_length = v;
        }
        if let Some(v) = self.max_suggestions {
            config.max_suggestions = v;
        }
        config
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON `{success, data | error}` envelope for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Accounts and sessions.
    Auth {
        /// Auth subcommand to execute.
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// List and manage your skills.
    Skill {
        /// Skill subcommand to execute.
        #[command(subcommand)]
        command: SkillCommands,
    },

    /// Post and browse service requests.
    Request {
        /// Request subcommand to execute.
        #[command(subcommand)]
        command: RequestCommands,
    },

    /// Suggest, accept and reject provider matches.
    Match {
        /// Match subcommand to execute.
        #[command(subcommand)]
        command: MatchCommands,
    },

    /// Propose and answer new exchange terms.
    Negotiate {
        /// Negotiation subcommand to execute.
        #[command(subcommand)]
        command: NegotiateCommands,
    },

    /// Work through a transaction.
    Tx {
        /// Transaction subcommand to execute.
        #[command(subcommand)]
        command: TxCommands,
    },

    /// Rate the other party of a completed transaction.
    Rate(RateArgs),

    /// Show a user's reputation and received ratings.
    Reputation {
        /// User to look up. Defaults to yourself.
        user: Option<UserId>,
    },

    /// Balance and credit history.
    Credits {
        /// Credits subcommand to execute.
        #[command(subcommand)]
        command: CreditsCommands,
    },

    /// Your notifications.
    Notify {
        /// Notification subcommand to execute.
        #[command(subcommand)]
        command: NotifyCommands,
    },

    /// Administrator operations.
    Admin {
        /// Admin subcommand to execute.
        #[command(subcommand)]
        command: AdminCommands,
    },
}

/// Auth subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommands {
    /// Create an account and sign in.
    Register {
        /// Email address.
        email: String,
        /// Display name.
        name: String,
        /// Password.
        #[arg(long, env = "SKILLSWAP_PASSWORD")]
        password: String,
    },

    /// Sign in and save the session.
    Login {
        /// Email address.
        email: String,
        /// Password.
        #[arg(long, env = "SKILLSWAP_PASSWORD")]
        password: String,
    },

    /// End the current session.
    Logout,

    /// Show the signed-in account.
    Whoami,

    /// Show another user's profile.
    Profile {
        /// User to show.
        user: UserId,
    },

    /// Change your display name or bio.
    Update {
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New bio. Pass an empty string to clear it.
        #[arg(long)]
        bio: Option<String>,
    },
}

/// Skill level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LevelArg {
    /// Still learning.
    Beginner,
    /// Comfortable.
    #[default]
    Intermediate,
    /// Professional quality.
    Expert,
}

impl From<LevelArg> for SkillLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Beginner => Self::Beginner,
            LevelArg::Intermediate => Self::Intermediate,
            LevelArg::Expert => Self::Expert,
        }
    }
}

/// Skill subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SkillCommands {
    /// List a new skill.
    Add(AddSkillArgs),

    /// Remove one of your skills.
    Remove {
        /// Skill to remove.
        id: SkillId,
    },

    /// Attach a portfolio item to one of your skills.
    Attach {
        /// Skill to attach to.
        id: SkillId,
        /// Attachment identifier.
        attachment: AttachmentId,
    },

    /// List a user's skills. Defaults to yours.
    List {
        /// Owner to list.
        #[arg(long)]
        user: Option<UserId>,
    },
}

/// Arguments for listing a skill.
#[derive(Args, Debug, Clone)]
pub struct AddSkillArgs {
    /// Skill name.
    pub name: String,

    /// Category, matched case-insensitively.
    #[arg(short, long)]
    pub category: String,

    /// Proficiency.
    #[arg(short, long, value_enum, default_value_t = LevelArg::Intermediate)]
    pub level: LevelArg,

    /// Asking rate in credits per hour.
    #[arg(short, long)]
    pub rate: Credits,

    /// Longer description.
    #[arg(short, long)]
    pub description: Option<String>,
}

/// Exchange terms given on the command line.
#[derive(Args, Debug, Clone)]
pub struct TermsArgs {
    /// Pay this many credits.
    #[arg(long, conflicts_with = "swap", required_unless_present = "swap")]
    pub credits: Option<Credits>,

    /// Offer one of your own skills instead of credits.
    #[arg(long)]
    pub swap: Option<SkillId>,

    /// Estimated hours of work.
    #[arg(long)]
    pub hours: Option<u32>,

    /// Free-form note.
    #[arg(long)]
    pub note: Option<String>,
}

impl TermsArgs {
    /// Builds exchange terms. Returns `None` if neither credits nor a skill
    /// was given.
    #[must_use]
    pub fn to_terms(&self) -> Option<ExchangeTerms> {
        let mut terms = match (&self.credits, &self.swap) {
            (Some(credits), _) => ExchangeTerms::credits(*credits),
            (None, Some(skill)) => ExchangeTerms::skill_swap(skill.clone()),
            (None, None) => return None,
        };
        if let Some(hours) = self.hours {
            terms = terms.with_hours(hours);
        }
        if let Some(note) = &self.note {
            terms = terms.with_note(note.clone());
        }
        Some(terms)
    }
}

/// Request subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RequestCommands {
    /// Post a service request.
    Create(CreateRequestArgs),

    /// Withdraw one of your requests.
    Cancel {
        /// Request to withdraw.
        id: RequestId,
    },

    /// Show a request.
    Show {
        /// Request to show.
        id: RequestId,
    },

    /// Browse open requests.
    List {
        /// Only this category.
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Your own requests.
    Mine,
}

/// Arguments for posting a request.
#[derive(Args, Debug, Clone)]
pub struct CreateRequestArgs {
    /// Short title.
    pub title: String,

    /// Category, matched case-insensitively.
    #[arg(short, long)]
    pub category: String,

    /// Details.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// What you offer in return.
    #[command(flatten)]
    pub terms: TermsArgs,
}

/// Match subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MatchCommands {
    /// Score providers for one of your requests.
    Suggest {
        /// Request to match.
        request: RequestId,
        /// Maximum suggestions to record.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Matches recorded for a request.
    List {
        /// Request to list.
        request: RequestId,
    },

    /// Matches suggesting you as provider.
    Mine,

    /// Accept a suggested provider.
    Accept {
        /// Match to accept.
        id: MatchId,
    },

    /// Decline a suggested provider.
    Reject {
        /// Match to decline.
        id: MatchId,
    },
}

/// Negotiation subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum NegotiateCommands {
    /// Propose new terms on an accepted match.
    Propose {
        /// Match to negotiate.
        #[arg(value_name = "MATCH")]
        match_id: MatchId,
        /// Proposed terms.
        #[command(flatten)]
        terms: TermsArgs,
    },

    /// Accept a proposal and open the transaction.
    Accept {
        /// Proposal to accept.
        id: NegotiationId,
    },

    /// Decline a proposal.
    Reject {
        /// Proposal to decline.
        id: NegotiationId,
    },

    /// Proposals on a match.
    List {
        /// Match to list.
        #[arg(value_name = "MATCH")]
        match_id: MatchId,
    },
}

/// Transaction subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TxCommands {
    /// Open a transaction on an accepted match with the posted terms.
    Create {
        /// Accepted match.
        #[arg(value_name = "MATCH")]
        match_id: MatchId,
    },

    /// Show a transaction.
    Show {
        /// Transaction to show.
        id: TransactionId,
    },

    /// Your transactions.
    List,

    /// Start work (provider).
    Start {
        /// Transaction to start.
        id: TransactionId,
    },

    /// Confirm the work is done.
    Confirm {
        /// Transaction to confirm.
        id: TransactionId,
    },

    /// Call off a pending transaction.
    Cancel {
        /// Transaction to cancel.
        id: TransactionId,
    },

    /// Raise a dispute.
    Dispute {
        /// Transaction to dispute.
        id: TransactionId,
        /// What went wrong.
        #[arg(short, long)]
        reason: String,
        /// Supporting attachments.
        #[arg(short, long, value_delimiter = ',')]
        evidence: Vec<AttachmentId>,
    },
}

/// Arguments for rating.
#[derive(Args, Debug, Clone)]
pub struct RateArgs {
    /// Completed transaction.
    pub transaction: TransactionId,

    /// Score from 1 to 5.
    pub score: u8,

    /// Optional comment.
    #[arg(short, long)]
    pub comment: Option<String>,
}

/// Credits subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CreditsCommands {
    /// Your balance.
    Balance,

    /// Your credit history, newest first.
    History {
        /// Show at most this many entries.
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Notification subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum NotifyCommands {
    /// List notifications, newest first.
    List {
        /// Only unread notifications.
        #[arg(short, long)]
        unread: bool,
    },

    /// Mark one notification read.
    Read {
        /// Notification to mark.
        id: NotificationId,
    },

    /// Mark every notification read.
    ReadAll,
}

/// Dispute resolution argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolutionArg {
    /// Treat the work as done and settle.
    Complete,
    /// Call the exchange off.
    Cancel,
}

impl From<ResolutionArg> for Resolution {
    fn from(resolution: ResolutionArg) -> Self {
        match resolution {
            ResolutionArg::Complete => Self::Complete,
            ResolutionArg::Cancel => Self::Cancel,
        }
    }
}

/// Admin subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Create the first administrator and sign in.
    Bootstrap {
        /// Email address.
        email: String,
        /// Display name.
        name: String,
        /// Password.
        #[arg(long, env = "SKILLSWAP_PASSWORD")]
        password: String,
    },

    /// Every account.
    Users,

    /// Suspend an account.
    Suspend {
        /// Account to suspend.
        user: UserId,
    },

    /// Lift a suspension.
    Reactivate {
        /// Account to reactivate.
        user: UserId,
    },

    /// Grant the admin role.
    Promote {
        /// Account to promote.
        user: UserId,
    },

    /// Adjust a balance by a signed amount.
    Adjust {
        /// Account to adjust.
        user: UserId,
        /// Signed amount.
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        /// Why.
        #[arg(short, long)]
        reason: String,
    },

    /// Disputed transactions.
    Disputes,

    /// Settle a dispute.
    Resolve {
        /// Disputed transaction.
        id: TransactionId,
        /// Outcome.
        #[arg(value_enum)]
        resolution: ResolutionArg,
    },

    /// Reverse a completed or disputed transaction.
    Reverse {
        /// Transaction to reverse.
        id: TransactionId,
    },

    /// Check cached balances against the ledger and repair drift.
    Reconcile,

    /// Purge expired sessions and expire stale proposals.
    Sweep,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags() {
        let cli = Cli::parse_from([
            "skillswap",
            "--state-dir",
            "/tmp/ss",
            "--format",
            "json",
            "credits",
            "balance",
        ]);
        assert_eq!(cli.state_dir, PathBuf::from("/tmp/ss"));
        assert_eq!(cli.format, Format::Json);
        assert!(matches!(
            cli.command,
            Commands::Credits {
                command: CreditsCommands::Balance
            }
        ));
    }

    #[test]
    fn config_overrides_replace_only_given_fields() {
        let cli = Cli::parse_from([
            "skillswap",
            "--initial-credits",
            "50",
            "credits",
            "balance",
            "--max-suggestions",
            "9",
        ]);
        let base = ServiceConfig {
            initial_credits: 10,
            session_ttl_hours: 3,
            ..ServiceConfig::default()
        };
        let merged = cli.config.apply(base.clone());
        assert_eq!(merged.initial_credits, 50);
        assert_eq!(merged.max_suggestions, 9);
        assert_eq!(merged.session_ttl_hours, 3);
        assert_eq!(merged.negotiation_ttl_hours, base.negotiation_ttl_hours);
        assert_eq!(ConfigArgs::default().apply(base.clone()), base);
    }

    #[test]
    fn request_requires_terms() {
        let parsed = Cli::try_parse_from(["skillswap", "request", "create", "Fix bike", "-c", "repairs"]);
        assert!(parsed.is_err());

        let cli = Cli::parse_from([
            "skillswap", "request", "create", "Fix bike", "-c", "repairs", "--credits", "20", "--hours", "2",
        ]);
        let Commands::Request {
            command: RequestCommands::Create(args),
        } = cli.command
        else {
            panic!("expected request create");
        };
        let terms = args.terms.to_terms().expect("terms");
        assert_eq!(terms.credits, Some(Credits::new(20)));
        assert_eq!(terms.hours, Some(2));
    }

    #[test]
    fn credits_and_swap_conflict() {
        let parsed = Cli::try_parse_from([
            "skillswap", "request", "create", "Fix bike", "-c", "repairs", "--credits", "20", "--swap", "s-1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn adjust_accepts_negative_amounts() {
        let cli = Cli::parse_from(["skillswap", "admin", "adjust", "u-1", "-25", "--reason", "chargeback"]);
        let Commands::Admin {
            command: AdminCommands::Adjust { amount, .. },
        } = cli.command
        else {
            panic!("expected admin adjust");
        };
        assert_eq!(amount, -25);
    }
}

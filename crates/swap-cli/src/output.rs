//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output. JSON output always uses
//! the `{success, data | error}` envelope.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use swap_auth::UserProfile;
use swap_ledger::{CreditEntry, Discrepancy};
use swap_market::{
    ExchangeMode, ExchangeTerms, Negotiation, Notification, Rating, Reputation, RoleReputation,
    ServiceRequest, Skill, SuggestedMatch, Transaction,
};
use swap_service::{AuthSession, Balance, NegotiationOutcome, Outcome, OutcomeError, SweepReport};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a successful result.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, &Outcome::ok(value))
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write a failure envelope. Table output leaves errors to stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_error<W: Write>(&self, writer: &mut W, error: &CliError) -> Result<(), CliError> {
        if !self.is_json() {
            return Ok(());
        }
        let outcome = Outcome::<()> {
            success: false,
            data: None,
            error: Some(OutcomeError {
                code: error.code().to_string(),
                message: error.to_string(),
            }),
        };
        serde_json::to_writer_pretty(&mut *writer, &outcome)
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(writer)?;
        Ok(())
    }

    /// Write a value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// One line in a list table.
pub trait TableRow {
    /// Column header line.
    const HEADER: &'static str;
    /// Shown instead of the table when the list is empty.
    const EMPTY: &'static str;
    /// Noun used in the total line.
    const NOUN: &'static str;

    /// Format this item as one line.
    fn row(&self) -> String;
}

impl<T: TableRow> TableDisplay for Vec<T> {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "{}", T::EMPTY)?;
            return Ok(());
        }
        writeln!(writer, "{}", T::HEADER)?;
        writeln!(writer, "{}", "─".repeat(T::HEADER.chars().count()))?;
        for item in self {
            writeln!(writer, "{}", item.row())?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} {}(s)", self.len(), T::NOUN)?;
        Ok(())
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    /// What happened.
    pub message: String,
    /// Number of affected items, when meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Ack {
    /// An acknowledgement without a count.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: None,
        }
    }

    /// An acknowledgement with a count.
    #[must_use]
    pub fn counted(message: impl Into<String>, count: usize) -> Self {
        Self {
            message: message.into(),
            count: Some(count),
        }
    }
}

impl TableDisplay for Ack {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

impl TableDisplay for AuthSession {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Signed in as {} <{}>", self.user.display_name, self.user.email)?;
        writeln!(writer, "User ID:          {}", self.user.id)?;
        writeln!(writer, "Credits:          {}", self.user.credits)?;
        writeln!(writer, "Session expires:  {}", timestamp(self.expires_at))?;
        Ok(())
    }
}

impl TableDisplay for UserProfile {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "User: {}", self.display_name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:               {}", self.id)?;
        writeln!(writer, "Email:            {}", self.email)?;
        writeln!(writer, "Role:             {}", self.role)?;
        writeln!(writer, "Status:           {}", self.status)?;
        writeln!(writer, "Credits:          {}", self.credits)?;
        if let Some(bio) = &self.bio {
            writeln!(writer, "Bio:              {bio}")?;
        }
        writeln!(writer, "Joined:           {}", timestamp(self.created_at))?;
        Ok(())
    }
}

impl TableRow for UserProfile {
    const HEADER: &'static str = "ID                                    NAME                  ROLE   STATUS     CREDITS";
    const EMPTY: &'static str = "No users";
    const NOUN: &'static str = "user";

    fn row(&self) -> String {
        format!(
            "{:<36}  {:<20}  {:<5}  {:<9}  {:>7}",
            self.id.to_string(),
            truncate(&self.display_name, 20),
            self.role.to_string(),
            self.status.to_string(),
            self.credits
        )
    }
}

impl TableDisplay for Balance {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let check = if self.verified { "✓ matches ledger" } else { "✗ differs from ledger" };
        writeln!(writer, "Balance: {} credits ({check})", self.credits)?;
        Ok(())
    }
}

impl TableRow for CreditEntry {
    const HEADER: &'static str = "DATE              TYPE        AMOUNT  BALANCE  DESCRIPTION";
    const EMPTY: &'static str = "No credit history";
    const NOUN: &'static str = "entry";

    fn row(&self) -> String {
        format!(
            "{:<16}  {:<10}  {:>+6}  {:>7}  {}",
            timestamp(self.created_at),
            self.entry_type.to_string(),
            self.amount,
            self.balance_after,
            self.description
        )
    }
}

impl TableDisplay for CreditEntry {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "Posted {:+} ({}); balance is now {}",
            self.amount, self.entry_type, self.balance_after
        )?;
        Ok(())
    }
}

impl TableDisplay for Skill {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Skill: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:               {}", self.id)?;
        writeln!(writer, "Category:         {}", self.category)?;
        writeln!(writer, "Level:            {}", self.level)?;
        writeln!(writer, "Rate:             {}/hour", self.hourly_rate)?;
        if let Some(description) = &self.description {
            writeln!(writer, "Description:      {description}")?;
        }
        if !self.portfolio.is_empty() {
            writeln!(writer, "Portfolio ({}):", self.portfolio.len())?;
            for item in &self.portfolio {
                writeln!(writer, "  {item}")?;
            }
        }
        Ok(())
    }
}

impl TableRow for Skill {
    const HEADER: &'static str = "ID                                    NAME                  CATEGORY      LEVEL         RATE";
    const EMPTY: &'static str = "No skills listed";
    const NOUN: &'static str = "skill";

    fn row(&self) -> String {
        format!(
            "{:<36}  {:<20}  {:<12}  {:<12}  {:>4}",
            self.id.to_string(),
            truncate(&self.name, 20),
            truncate(&self.category, 12),
            self.level.to_string(),
            self.hourly_rate.get()
        )
    }
}

impl TableDisplay for ServiceRequest {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Request: {}", self.title)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "ID:               {}", self.id)?;
        writeln!(writer, "Status:           {}", self.status)?;
        writeln!(writer, "Category:         {}", self.category)?;
        writeln!(writer, "Terms:            {}", terms(&self.terms))?;
        writeln!(writer, "Requester:        {}", self.requester)?;
        if let Some(provider) = &self.provider {
            writeln!(writer, "Provider:         {provider}")?;
        }
        if !self.description.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.description)?;
        }
        Ok(())
    }
}

impl TableRow for ServiceRequest {
    const HEADER: &'static str = "ID                                    TITLE                 CATEGORY      STATUS       TERMS";
    const EMPTY: &'static str = "No requests found";
    const NOUN: &'static str = "request";

    fn row(&self) -> String {
        format!(
            "{:<36}  {:<20}  {:<12}  {:<11}  {}",
            self.id.to_string(),
            truncate(&self.title, 20),
            truncate(&self.category, 12),
            self.status.to_string(),
            terms(&self.terms)
        )
    }
}

impl TableDisplay for SuggestedMatch {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Match {} ({})", self.id, self.status)?;
        writeln!(writer, "Request:          {}", self.request_id)?;
        writeln!(writer, "Provider:         {}", self.provider_id)?;
        writeln!(writer, "Skill:            {}", self.skill_id)?;
        writeln!(writer, "Score:            {}", self.score)?;
        if let Some(tx) = &self.transaction_id {
            writeln!(writer, "Transaction:      {tx}")?;
        }
        Ok(())
    }
}

impl TableRow for SuggestedMatch {
    const HEADER: &'static str = "ID                                    PROVIDER                              SCORE  STATUS";
    const EMPTY: &'static str = "No matches";
    const NOUN: &'static str = "match";

    fn row(&self) -> String {
        format!(
            "{:<36}  {:<36}  {:>5}  {}",
            self.id.to_string(),
            self.provider_id.to_string(),
            self.score,
            self.status
        )
    }
}

impl TableDisplay for Negotiation {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Proposal {} ({})", self.id, self.status)?;
        writeln!(writer, "Match:            {}", self.match_id)?;
        writeln!(writer, "Proposed by:      {}", self.proposer)?;
        writeln!(writer, "Awaiting:         {}", self.counterparty)?;
        writeln!(writer, "Terms:            {}", terms(&self.terms))?;
        writeln!(writer, "Expires:          {}", timestamp(self.expires_at))?;
        Ok(())
    }
}

impl TableRow for Negotiation {
    const HEADER: &'static str = "ID                                    STATUS    EXPIRES           TERMS";
    const EMPTY: &'static str = "No proposals";
    const NOUN: &'static str = "proposal";

    fn row(&self) -> String {
        format!(
            "{:<36}  {:<8}  {:<16}  {}",
            self.id.to_string(),
            self.status.to_string(),
            timestamp(self.expires_at),
            terms(&self.terms)
        )
    }
}

impl TableDisplay for NegotiationOutcome {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        self.negotiation.write_table(writer)?;
        if let Some(tx) = &self.transaction {
            writeln!(writer)?;
            tx.write_table(writer)?;
        }
        Ok(())
    }
}

impl TableDisplay for Transaction {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Transaction: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "Status:           {}", self.status)?;
        writeln!(writer, "Terms:            {}", terms(&self.terms))?;
        writeln!(writer, "Requester:        {} {}", self.requester, confirmed(self.requester_confirmed))?;
        writeln!(writer, "Provider:         {} {}", self.provider, confirmed(self.provider_confirmed))?;
        writeln!(writer, "Credits settled:  {}", if self.credits_settled { "yes" } else { "no" })?;
        if let Some(dispute) = &self.dispute {
            writeln!(writer)?;
            writeln!(writer, "Dispute raised by {}: {}", dispute.raised_by, dispute.reason)?;
        }
        if let Some(resolution) = self.resolution {
            writeln!(writer, "Resolution:       {resolution}")?;
        }
        Ok(())
    }
}

impl TableRow for Transaction {
    const HEADER: &'static str = "ID                                    STATUS       CONFIRMED  TERMS";
    const EMPTY: &'static str = "No transactions";
    const NOUN: &'static str = "transaction";

    fn row(&self) -> String {
        let both = u8::from(self.requester_confirmed) + u8::from(self.provider_confirmed);
        format!(
            "{:<36}  {:<11}  {both}/2        {}",
            self.id.to_string(),
            self.status.to_string(),
            terms(&self.terms)
        )
    }
}

impl TableDisplay for Rating {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Rated {} {}/5 as {}", self.ratee, self.score.get(), self.role)?;
        if let Some(comment) = &self.comment {
            writeln!(writer, "  \"{comment}\"")?;
        }
        Ok(())
    }
}

impl TableRow for Rating {
    const HEADER: &'static str = "DATE              ROLE       SCORE  COMMENT";
    const EMPTY: &'static str = "No ratings";
    const NOUN: &'static str = "rating";

    fn row(&self) -> String {
        format!(
            "{:<16}  {:<9}  {:>5}  {}",
            timestamp(self.updated_at),
            self.role.to_string(),
            self.score.get(),
            self.comment.as_deref().unwrap_or("")
        )
    }
}

/// Reputation plus the ratings behind it.
#[derive(Debug, Clone, Serialize)]
pub struct ReputationView {
    /// Averages per role.
    pub reputation: Reputation,
    /// Ratings received, newest first.
    pub ratings: Vec<Rating>,
}

impl TableDisplay for ReputationView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Reputation: {}", self.reputation.user_id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "As provider:      {}", role_summary(self.reputation.as_provider.as_ref()))?;
        writeln!(writer, "As requester:     {}", role_summary(self.reputation.as_requester.as_ref()))?;
        writeln!(writer)?;
        self.ratings.write_table(writer)
    }
}

impl TableRow for Notification {
    const HEADER: &'static str = "ID                                    DATE              KIND                    MESSAGE";
    const EMPTY: &'static str = "No notifications";
    const NOUN: &'static str = "notification";

    fn row(&self) -> String {
        let marker = if self.read { ' ' } else { '*' };
        format!(
            "{:<36}  {:<16}  {marker}{:<22}  {}",
            self.id.to_string(),
            timestamp(self.created_at),
            self.kind.to_string(),
            self.message
        )
    }
}

impl TableRow for Discrepancy {
    const HEADER: &'static str = "USER                                  CACHED   LEDGER";
    const EMPTY: &'static str = "All balances match the ledger";
    const NOUN: &'static str = "repaired balance";

    fn row(&self) -> String {
        format!("{:<36}  {:>7}  {:>7}", self.user_id.to_string(), self.cached, self.ledger)
    }
}

impl TableDisplay for SweepReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Purged {} expired session(s)", self.sessions_purged)?;
        writeln!(writer, "Expired {} stale proposal(s)", self.negotiations_expired)?;
        Ok(())
    }
}

fn terms(terms: &ExchangeTerms) -> String {
    let mut out = match (terms.mode, &terms.credits, &terms.offered_skill) {
        (ExchangeMode::Credits, Some(credits), _) => credits.to_string(),
        (ExchangeMode::SkillSwap, _, Some(skill)) => format!("swap for skill {skill}"),
        (mode, _, _) => mode.to_string(),
    };
    if let Some(hours) = terms.hours {
        out.push_str(&format!(", {hours}h"));
    }
    out
}

fn role_summary(role: Option<&RoleReputation>) -> String {
    role.map_or_else(
        || "no ratings yet".to_string(),
        |r| format!("{:.1}/5 from {} rating(s)", r.average, r.count),
    )
}

const fn confirmed(flag: bool) -> &'static str {
    if flag { "(confirmed)" } else { "" }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_core::{Credits, SkillId, UserId};
    use swap_market::SkillLevel;

    fn skill() -> Skill {
        Skill {
            id: SkillId::new(),
            owner: UserId::new(),
            name: "Watercolour painting".to_string(),
            category: "art".to_string(),
            level: SkillLevel::Expert,
            hourly_rate: Credits::new(12),
            description: None,
            portfolio: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("crème brûlée", 8), "crème...");
    }

    #[test]
    fn json_output_uses_envelope() {
        let fmt = OutputFormat::new(Format::Json);
        let output = fmt.to_string(&Ack::new("done")).expect("should format");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["message"], "done");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn json_error_envelope() {
        let fmt = OutputFormat::new(Format::Json);
        let mut buf = Vec::new();
        fmt.write_error(&mut buf, &CliError::NotLoggedIn).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "unauthenticated");
    }

    #[test]
    fn table_error_writes_nothing() {
        let fmt = OutputFormat::new(Format::Table);
        let mut buf = Vec::new();
        fmt.write_error(&mut buf, &CliError::NotLoggedIn).expect("write");
        assert!(buf.is_empty());
    }

    #[test]
    fn skill_list_table() {
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&vec![skill()]).expect("should format");
        assert!(output.contains("Watercolour painting"));
        assert!(output.contains("Total: 1 skill(s)"));
    }

    #[test]
    fn empty_list_message() {
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&Vec::<Skill>::new()).expect("should format");
        assert!(output.contains("No skills listed"));
    }

    #[test]
    fn terms_summary() {
        let t = ExchangeTerms::credits(Credits::new(30)).with_hours(2);
        assert_eq!(terms(&t), "30 credits, 2h");
    }
}

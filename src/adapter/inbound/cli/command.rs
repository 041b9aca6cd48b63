//! Command-line interface definitions.
//!
//! Defines the operator CLI for the arbfill fulfillment service using `clap`.
//! Amounts are integer cents throughout.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::domain::{SourcePlatform, TransactionId};

/// Fulfillment orchestration for arbitrage listings
#[derive(Parser, Debug)]
#[command(name = "arbfill")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the arbfill CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work the manual fulfillment queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Price a sale without recording it
    Profit(ProfitArgs),

    /// Aggregate statistics over transactions and the queue
    Stats,

    /// Record a captured payment as a pending transaction
    Record(RecordArgs),

    /// Fulfill a pending transaction
    Process(TransactionArg),

    /// Show the buyer-facing status of a transaction
    Status(TransactionArg),

    /// Cancel fulfillment and refund the buyer
    Refund(RefundArgs),

    /// Fail a transaction stuck in PROCESSING and refund the buyer
    Fail(FailArgs),

    /// Manual task SLA checks
    #[command(subcommand)]
    Sla(SlaCommand),

    /// Run the SLA monitor until interrupted
    Run,
}

/// Subcommands for `arbfill queue`.
#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List tasks, oldest first.
    List(QueueListArgs),
    /// Show one task in full.
    View(TaskArg),
    /// Deliver the result of a manual task and close it.
    Complete(CompleteArgs),
}

/// Subcommands for `arbfill sla`.
#[derive(Subcommand, Debug)]
pub enum SlaCommand {
    /// Run one sweep now and report breaches.
    Check,
}

/// Which tasks `queue list` shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFilter {
    /// Tasks waiting for an operator
    #[default]
    Pending,
    /// Delivered tasks
    Completed,
    /// Tasks withdrawn because their sale was refunded
    Cancelled,
    /// Every task
    All,
}

#[derive(Args, Debug)]
pub struct QueueListArgs {
    /// Task status to show
    #[arg(long, value_enum, default_value_t = StatusFilter::Pending)]
    pub status: StatusFilter,
}

#[derive(Args, Debug)]
pub struct TaskArg {
    /// Task number
    pub number: u64,
}

/// Exactly one delivery kind is required.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("delivery")
        .required(true)
        .args(["file", "credential", "text", "url"])
))]
pub struct CompleteArgs {
    /// Task number
    pub number: u64,

    /// Path of a file delivered to the buyer
    #[arg(long, value_name = "PATH")]
    pub file: Option<String>,

    /// One credential line; repeat for several
    #[arg(long, value_name = "LINE")]
    pub credential: Vec<String>,

    /// Free text result
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Link to the result
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Operator notes stored with the delivery
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProfitArgs {
    /// Amount the buyer paid, in cents
    #[arg(allow_negative_numbers = true)]
    pub buyer_paid: i64,

    /// Cost at the source, in cents
    #[arg(allow_negative_numbers = true)]
    pub source_cost: i64,

    /// Source platform tag (rapidapi, huggingface, github, fiverr, upwork)
    pub platform: SourcePlatform,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Buyer identifier
    #[arg(long)]
    pub buyer: String,

    /// Listing identifier from the catalog
    #[arg(long)]
    pub listing: String,

    /// Payment processor reference (e.g. a payment intent id)
    #[arg(long)]
    pub payment: String,

    /// Amount paid, in cents
    #[arg(long)]
    pub amount: i64,

    /// Buyer input as JSON
    #[arg(long, default_value = "{}")]
    pub input: String,
}

#[derive(Args, Debug)]
pub struct TransactionArg {
    /// Transaction id
    pub id: TransactionId,
}

#[derive(Args, Debug)]
pub struct RefundArgs {
    /// Transaction id
    pub id: TransactionId,

    /// Reason recorded on the transaction
    #[arg(long, default_value = "cancelled by operator")]
    pub reason: String,
}

#[derive(Args, Debug)]
pub struct FailArgs {
    /// Transaction id
    pub id: TransactionId,

    /// Reason recorded on the transaction
    #[arg(long)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["arbfill", "stats", "--json", "-c", "prod.toml"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("prod.toml"));
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::try_parse_from(["arbfill", "run"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn queue_list_defaults_to_pending() {
        let cli = Cli::try_parse_from(["arbfill", "queue", "list"]).unwrap();
        let Commands::Queue(QueueCommand::List(args)) = cli.command else {
            panic!("expected queue list");
        };
        assert_eq!(args.status, StatusFilter::Pending);

        let cli = Cli::try_parse_from(["arbfill", "queue", "list", "--status", "all"]).unwrap();
        let Commands::Queue(QueueCommand::List(args)) = cli.command else {
            panic!("expected queue list");
        };
        assert_eq!(args.status, StatusFilter::All);
    }

    #[test]
    fn complete_accepts_repeated_credentials() {
        let cli = Cli::try_parse_from([
            "arbfill",
            "queue",
            "complete",
            "7",
            "--credential",
            "user: a",
            "--credential",
            "pass: b",
            "--notes",
            "sent by email",
        ])
        .unwrap();
        let Commands::Queue(QueueCommand::Complete(args)) = cli.command else {
            panic!("expected queue complete");
        };
        assert_eq!(args.number, 7);
        assert_eq!(args.credential, vec!["user: a", "pass: b"]);
        assert_eq!(args.notes.as_deref(), Some("sent by email"));
    }

    #[test]
    fn complete_requires_exactly_one_delivery() {
        assert!(Cli::try_parse_from(["arbfill", "queue", "complete", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "arbfill", "queue", "complete", "1", "--text", "a", "--url", "https://x.test"
        ])
        .is_err());
    }

    #[test]
    fn profit_parses_platform_tag() {
        let cli = Cli::try_parse_from(["arbfill", "profit", "5000", "2000", "Fiverr"]).unwrap();
        let Commands::Profit(args) = cli.command else {
            panic!("expected profit");
        };
        assert_eq!(args.platform, SourcePlatform::Fiverr);
        assert!(Cli::try_parse_from(["arbfill", "profit", "5000", "2000", "etsy"]).is_err());
    }

    #[test]
    fn transaction_id_must_be_a_uuid() {
        assert!(Cli::try_parse_from(["arbfill", "status", "not-a-uuid"]).is_err());
        let id = TransactionId::new().to_string();
        let cli = Cli::try_parse_from(["arbfill", "refund", &id]).unwrap();
        let Commands::Refund(args) = cli.command else {
            panic!("expected refund");
        };
        assert_eq!(args.id.to_string(), id);
        assert_eq!(args.reason, "cancelled by operator");
    }

    #[test]
    fn fail_requires_a_reason() {
        let id = TransactionId::new().to_string();
        assert!(Cli::try_parse_from(["arbfill", "fail", &id]).is_err());

        let cli =
            Cli::try_parse_from(["arbfill", "fail", &id, "--reason", "worker crashed"]).unwrap();
        let Commands::Fail(args) = cli.command else {
            panic!("expected fail");
        };
        assert_eq!(args.reason, "worker crashed");
    }
}

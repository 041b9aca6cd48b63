//! Route a parsed command line to its handler.

use super::command::{Cli, ColorChoice, Commands, QueueCommand, SlaCommand};
use super::output::{self, OutputConfig};
use super::{profit, queue, sla, stats, transaction};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Apply the global flags: output mode and colour override.
pub fn configure(cli: &Cli) {
    output::configure(OutputConfig::new(cli.json, cli.quiet));
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto if cli.json => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
}

/// Load configuration, start logging, and run the command.
///
/// A missing config file means defaults, so `profit` and `queue list` work
/// in a fresh directory.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config)?;
    config.init_logging();

    match cli.command {
        Commands::Queue(QueueCommand::List(args)) => queue::list(config, &args).await,
        Commands::Queue(QueueCommand::View(args)) => queue::view(config, &args).await,
        Commands::Queue(QueueCommand::Complete(args)) => queue::complete(config, args).await,
        Commands::Profit(args) => profit::execute(&config, &args),
        Commands::Stats => stats::execute(config).await,
        Commands::Record(args) => transaction::record(config, args).await,
        Commands::Process(args) => transaction::process(config, &args).await,
        Commands::Status(args) => transaction::status(config, &args).await,
        Commands::Refund(args) => transaction::refund(config, args).await,
        Commands::Fail(args) => transaction::fail(config, args).await,
        Commands::Sla(SlaCommand::Check) => sla::check(config).await,
        Commands::Run => sla::run(config).await,
    }
}

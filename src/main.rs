use clap::Parser;

use arbfill::adapter::inbound::cli::command::Cli;
use arbfill::adapter::inbound::cli::{diagnostic, dispatch};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    dispatch::configure(&cli);
    let config_path = cli.config.clone();

    if let Err(e) = dispatch::execute(cli).await {
        eprintln!("{:?}", diagnostic::report(e, &config_path));
        std::process::exit(1);
    }
}

use clap::Parser;
use pmp_trials::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => cli::validate::run(args).await,
        Command::Evaluate(args) => cli::evaluate::run(args).await,
    }
}

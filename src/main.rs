use clap::Parser;
use prompt_registry::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Format(args) => cli::format::run(args).await,
        Command::Variables(args) => cli::variables::run(args).await,
    }
}

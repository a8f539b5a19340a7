//! debslim - slim Debian mirror CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use debslim_cli::cmd;
use debslim_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Curate(args) => cmd::curate::curate(&args).await,
        Commands::Filter(args) => cmd::filter::filter(&args),
        Commands::Publish(args) => cmd::publish::publish(&args).await,
    }
}

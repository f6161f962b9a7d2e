//! # statping: Statping stack CLI
//!
//! Renders the Statping deployment (network, database, Fargate service
//! behind HTTPS) as a CloudFormation template.

mod commands;
mod output;
mod profiles;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}

//! algocatalog CLI: builds a multi-language algorithm catalog.
//!
//! Pulls implementations from several source repositories, merges them by
//! normalized algorithm name, and writes the catalog as static JSON files.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

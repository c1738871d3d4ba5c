//! abstractkb CLI: keyword knowledge base over newly listed abstracts.
//!
//! Scans a listing page, fetches each linked abstract, and indexes the
//! sentences of every abstract under its most frequent keywords.

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

//! Flux Sales CLI: research healthcare imaging prospects and generate
//! sales packages for the Flux product line.
//!
//! Company data comes from Apollo.io, facility intel from the prospect's
//! website, and the package itself from an OpenAI chat model.

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

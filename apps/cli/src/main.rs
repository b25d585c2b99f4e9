//! CoursePilot CLI: course catalog ingestion and graduate course recommendations.
//!
//! Loads a course catalog into a Chroma collection, then answers student
//! profiles with a model-written, grouped and sequenced course plan.

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

//! ClauseMind CLI
//!
//! Ingest insurance documents and get evidence-grounded, cited decisions
//! for natural-language questions.

use clap::Parser;
use clausemind_core::Config;

mod app;
mod commands;
mod engine;

use app::{Cli, Commands};
use engine::Engine;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> clausemind_core::Result<()> {
    let config = Config::load()?;
    let engine = Engine::open(config).await?;

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &engine, cli.format).await,
        Commands::Query(args) => commands::query::run(args, &engine, cli.format).await,
        Commands::Documents => commands::documents::run(&engine, cli.format).await,
        Commands::Stats => commands::stats::run(&engine, cli.format).await,
        Commands::Delete(args) => commands::delete::run(args, &engine, cli.format).await,
        Commands::Health => commands::health::run(&engine, cli.format),
    }
}

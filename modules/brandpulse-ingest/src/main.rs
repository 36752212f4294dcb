use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use brandpulse_common::Config;
use brandpulse_ingest::Orchestrator;
use brandpulse_store::PgStore;

#[derive(Parser)]
#[command(name = "brandpulse-ingest", about = "Run the AI visibility ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run ingestion across all companies with active prompts.
    Run {
        /// Restrict the run to one company (recovery / testing).
        #[arg(long)]
        company: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("BrandPulse ingest starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store = Arc::new(PgStore::connect(&config.database_url).await?);

    let cli = Cli::parse();
    match cli.command {
        Command::Run { company } => {
            let orchestrator = Orchestrator::from_config(store, &config);
            let stats = orchestrator.run(company).await?;
            info!("{stats}");
        }
    }

    Ok(())
}

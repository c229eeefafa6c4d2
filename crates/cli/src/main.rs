//! helpdesk CLI — the main entry point.
//!
//! Commands:
//! - `serve` — start the HTTP gateway
//! - `seed`  — populate the database with the demo dataset

use clap::{Parser, Subcommand};
use helpdesk_core::event::EventBus;
use helpdesk_gateway::GatewayState;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "helpdesk",
    about = "helpdesk — multi-agent customer support runtime",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Populate the database with the demo dataset
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = helpdesk_config::AppConfig::load()?;

    match cli.command {
        Commands::Serve { port } => {
            let store = Arc::new(helpdesk_store::SqliteStore::new(&config.database.url).await?);
            let model = helpdesk_providers::build_from_config(&config);
            let event_bus = Arc::new(EventBus::default());

            let orchestrator = Arc::new(helpdesk_agent::Orchestrator::new(
                store.clone(),
                store.clone(),
                model,
                &config,
                event_bus,
            ));

            let state = Arc::new(GatewayState {
                orchestrator,
                conversations: store,
            });

            let port = port.unwrap_or(config.gateway.port);
            helpdesk_gateway::serve(state, &config.gateway.host, port).await?;
        }
        Commands::Seed => {
            let store = helpdesk_store::SqliteStore::new(&config.database.url).await?;
            helpdesk_store::seed::run(&store).await?;
            info!("Demo dataset seeded into {}", config.database.url);
        }
    }

    Ok(())
}

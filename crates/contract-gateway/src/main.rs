//! Contract gateway daemon - validating SSE relay for generated Terms of Service

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use contract_gateway::config::Config;
use contract_gateway::error::Result;
use contract_gateway::relay::GatewayServer;

/// Contract gateway - validates business prompts and streams generated contracts
#[derive(Parser)]
#[command(name = "contract-gateway")]
#[command(about = "Validates business prompts and streams generated Terms of Service")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the gateway server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,contract_gateway=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting contract gateway");

    let config = Config::load(config_path)?;
    tracing::debug!("Config loaded: {:?}", config);

    GatewayServer::new(config).serve().await?;

    tracing::info!("Contract gateway stopped");
    Ok(())
}

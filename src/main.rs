//! Reversi Lobby - server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use reversi_lobby::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => run_server(config.with_bind(host, port)).await,
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Run the WebSocket server
async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    info!(
        addr = %config.bind_addr(),
        max_password_len = config.max_password_len(),
        leave_on_disconnect = config.leave_on_disconnect(),
        "Starting Reversi lobby server"
    );

    reversi_lobby::serve(&config).await?;
    Ok(())
}

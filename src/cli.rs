//! Command-line interface for reversi_lobby.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reversi Lobby - authoritative Reversi server over WebSockets
#[derive(Parser, Debug)]
#[command(name = "reversi_lobby")]
#[command(about = "Lobby and Reversi game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as TOML
    Config,
}

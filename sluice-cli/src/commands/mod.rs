//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod config;
mod poll;

use poll::PollArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::QueueArgs;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Consume the queue until interrupted with Ctrl-C
    Poll(PollArgs),
    /// Print the effective configuration without connecting
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, queue: &QueueArgs) -> Result<()> {
    match command {
        Commands::Poll(args) => poll::handle_poll_command(args, queue).await,
        Commands::Config { json } => config::handle_config_command(queue, json),
    }
}

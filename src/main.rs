//! tailtrim
//!
//! Removes the last three seconds of a video without re-encoding.
//!
//! # Usage
//!
//! ```bash
//! tailtrim trim --input holiday.mp4 --output-dir out/
//! tailtrim probe --input holiday.mp4 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tailtrim::cli::{commands, Cli, Commands};
use tailtrim::config_initialization::initialize_configuration;
use tailtrim::utils::logging::{init_logging, LoggingConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = initialize_configuration(&cli)?;

    init_logging(&LoggingConfig {
        level: config.log.level.clone(),
        json: config.log.json,
    })?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting tailtrim");

    match cli.command {
        Commands::Trim(args) => commands::trim(args, &config).await,
        Commands::Probe(args) => commands::probe(args).await,
    }
}

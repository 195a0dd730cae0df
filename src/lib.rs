pub mod cli;
pub mod core;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Entry point shared by the binary: parse arguments, set up logging, sync.
pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gamevault_importer=debug")),
        )
        .init();

    tracing::info!("gamevault-importer {} starting...", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}

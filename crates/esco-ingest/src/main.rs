//! ESCO Ingest - skills taxonomy extraction tool

use anyhow::Result;
use clap::Parser;
use esco_common::logging::{init_logging, LogConfig, LogLevel};
use esco_ingest::cli::{self as commands, Cli, Commands};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("esco-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match &cli.command {
        Commands::Extract(args) => {
            info!("Extracting ESCO skills");
            commands::extract(args).await?;
        },
        Commands::Version(args) => {
            let version = commands::version(args).await?;
            println!("{}", version);
        },
    }

    Ok(())
}

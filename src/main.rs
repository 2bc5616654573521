//! surrogate-prep - Main Entry Point
//!
//! Prepares simulation tables for surrogate model training.

use clap::Parser;
use surrogate_prep::cli::{cmd_cluster, cmd_info, cmd_prepare, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surrogate_prep=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare(args) => {
            cmd_prepare(&args)?;
        }
        Commands::Cluster { source, inputs, outputs, eps, min_samples } => {
            cmd_cluster(&source, inputs, outputs, eps, min_samples)?;
        }
        Commands::Info { source } => {
            cmd_info(&source)?;
        }
    }

    Ok(())
}

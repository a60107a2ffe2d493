//! Binary Forest - Main Entry Point

use binary_forest::cli::Cli;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "binary_forest=info".into()),
        )
        .init();

    Cli::parse().run()
}

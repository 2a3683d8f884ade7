//! Genoscout — genomics paper acquisition.
//! Entry point for the `genoscout` binary.
//!
//! Logs go to stderr; stdout carries only the final `MANIFEST: <path>` line
//! so a calling script can pick it up.

mod cli;

use anyhow::Context;
use clap::Parser;
use genoscout_common::PipelineConfig;
use genoscout_ingestion::run_pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("genoscout=info,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    info!("Genoscout {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let path = cli.config_path();
    let mut config = PipelineConfig::load(&path)
        .with_context(|| format!("Copy genoscout.example.yaml to {} and edit it", path.display()))?;
    cli.apply(&mut config);
    config.validate()?;

    info!(
        days = config.days_lookback,
        keywords = config.genomics_keywords.len(),
        feeds = config.journal_feeds.len(),
        download_pdfs = config.download_pdfs,
        "Configuration loaded"
    );

    let outcome = run_pipeline(config).await?;
    info!(duration_ms = outcome.duration_ms, "Run finished");

    println!("\nMANIFEST: {}", outcome.manifest_path.display());
    Ok(())
}

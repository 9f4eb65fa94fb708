use std::path::PathBuf;

use clap::Parser;
use isbn_enrich::{Config, Enricher, load_identifiers};

/// Enrich an ISBN list with bibliographic metadata, resuming from checkpoints
#[derive(Debug, Parser)]
#[command(name = "isbn-enrich", version)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source dataset, overriding `source.input_path`
    #[arg(long)]
    input: Option<PathBuf>,

    /// Merged output file, overriding `storage.output_path`
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(input) = cli.input {
        config.source.input_path = input;
    }
    if let Some(output) = cli.output {
        config.storage.output_path = output;
    }

    let enricher = Enricher::new(config)?;
    let source = &enricher.config().source;
    let identifiers = load_identifiers(&source.input_path, source)?;

    let report = enricher.run(&identifiers).await?;
    tracing::info!(
        batches = report.batches,
        skipped = report.skipped,
        succeeded = report.succeeded,
        degraded = report.degraded,
        checkpoint_failed = report.checkpoint_failed,
        dropped_identifiers = report.dropped_identifiers,
        rows = report.output_rows,
        path = %report.output_path.display(),
        "Enrichment finished"
    );
    Ok(())
}

//! # Analysis Dispatch CLI
//!
//! Runs the template analyzer over a JSON array of chunks and writes the
//! merged analysis as JSON.

use analysis_dispatch::config::ConfigLoader;
use analysis_dispatch::logging::init_structured_logging;
use analysis_dispatch::models::WorkChunk;
use analysis_dispatch::processor::AnalysisProcessor;
use analysis_dispatch::worker::TemplateAnalyzer;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "analysis-dispatch")]
#[command(about = "Dispatch source chunks to analysis workers and merge the results")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// JSON file containing an array of chunks
    #[arg(long)]
    chunks: PathBuf,

    /// Pool configuration file (TOML, YAML or JSON); DISPATCH_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the merged analysis here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force in-process execution regardless of configuration
    #[arg(long)]
    in_process: bool,

    /// Fold results as they settle
    #[arg(long)]
    streaming: bool,

    /// Print per-worker health to stderr after the run
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().context("failed to load pool configuration")?;
    if cli.in_process {
        config.use_workers = false;
    }
    if cli.streaming {
        config.streaming = true;
    }

    let raw = std::fs::read_to_string(&cli.chunks)
        .with_context(|| format!("failed to read {}", cli.chunks.display()))?;
    let chunks: Vec<WorkChunk> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of chunks", cli.chunks.display()))?;

    let processor = AnalysisProcessor::new(config, Arc::new(TemplateAnalyzer::new()))
        .await
        .context("failed to start worker pool")?;

    let result = processor
        .process(&chunks, |event| {
            eprintln!(
                "[{:>5.1}%] {}/{} chunks, {} active, {} idle, {} failed",
                event.percentage,
                event.processed,
                event.total,
                event.active_workers,
                event.available_workers,
                event.failed
            );
        })
        .await;

    if cli.health {
        if let Some(pool) = processor.pool() {
            eprintln!("{}", serde_json::to_string_pretty(&pool.all_health())?);
        }
    }
    processor.shutdown().await;

    let merged = result.context("analysis run failed")?;
    let json = serde_json::to_string_pretty(&merged)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Merged analysis written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

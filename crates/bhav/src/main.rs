//! Command-line entry point for the bhav pipeline.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bhav::{
    BatchRunner, DateKey, NormalizedRecord, NseArchiveFetcher, PipelineConfig, fetch_single,
    normalize_tree, read_date_key,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bhav", version, about = "Download and normalize NSE bhavdata files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every trading day of the trailing window into year folders.
    Batch,
    /// Fetch a single day into the output directory.
    Daily {
        /// Date as DDMMYYYY. Prompted for when omitted.
        date: Option<String>,
        /// Number of saved rows to print.
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },
    /// Normalize every CSV in the year folders below ROOT.
    Normalize {
        /// Defaults to the configured output directory.
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Batch => run_batch(config).await,
        Command::Daily { date, preview } => run_daily(config, date, preview).await,
        Command::Normalize { root } => run_normalize(&config, root),
    }
}

async fn run_batch(config: PipelineConfig) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let runner = BatchRunner::with_nse(config);
    let report = runner.run(today).await.context("batch run aborted")?;

    println!(
        "{} of {} trading dates saved, {} failed",
        report.succeeded(),
        report.planned,
        report.failed()
    );
    for result in report.failures() {
        if let Some(err) = result.outcome.error() {
            println!("  {}: {err}", result.date);
        }
    }
    Ok(())
}

async fn run_daily(config: PipelineConfig, date: Option<String>, preview: usize) -> Result<()> {
    let key = match date {
        Some(date) => DateKey::parse(&date)
            .map_err(|_| anyhow::anyhow!(bhav::INVALID_DATE_MESSAGE))?,
        None => {
            print!("Enter the date (DDMMYYYY): ");
            io::stdout().flush()?;
            read_date_key(io::stdin().lock())?
        }
    };

    let fetcher = NseArchiveFetcher::new();
    let outcome = fetch_single(&fetcher, &config, &key)
        .await
        .with_context(|| format!("could not fetch {key}"))?;

    println!(
        "Saved {} ({} of {} rows kept)",
        outcome.path.display(),
        outcome.report.rows_retained,
        outcome.report.rows_read
    );

    if preview > 0 {
        let records = NormalizedRecord::read_file(&outcome.path)
            .with_context(|| format!("could not read back {}", outcome.path.display()))?;
        for record in records.iter().take(preview) {
            println!(
                "  {:<12} {} close {}",
                record.symbol,
                record.trade_date.as_deref().unwrap_or("-"),
                record.close.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn run_normalize(config: &PipelineConfig, root: Option<PathBuf>) -> Result<()> {
    let root = root.unwrap_or_else(|| config.output_dir.clone());
    let report = normalize_tree(&root)
        .with_context(|| format!("could not sweep {}", root.display()))?;

    println!(
        "{} files normalized, {} skipped",
        report.normalized.len(),
        report.failed.len()
    );
    for (path, err) in &report.failed {
        println!("  {}: {err}", path.display());
    }
    Ok(())
}

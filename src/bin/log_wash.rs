//! Request log converter
//!
//! Filters a request log down to its SUCCESS/FAILURE records and writes them
//! as CSV (`Timestamp, Method, Endpoint, Response Time (ms), Size (bytes)`).
//!
//! Usage:
//!   cargo run --release --bin log-wash -- results/fine/requests_1_41_41_2m_1.log
//!   cargo run --release --bin log-wash -- run.log -o results/requests.csv --summary RESULTS.md

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use train_load::summary::render_markdown;
use train_load::{convert, init_tracing, summarize, update_section};

#[derive(Debug, Parser)]
#[command(name = "log-wash", about = "Convert a request log to CSV")]
struct Args {
    /// Request log to read
    log: PathBuf,

    /// CSV file to write (defaults to the log path with a .csv extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Markdown file to update with a per-endpoint latency section
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Section title used in the summary file
    #[arg(long, default_value = "Request Latency")]
    title: String,

    /// Print per-endpoint statistics as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let args = Args::parse();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.log.with_extension("csv"));

    let records = convert(&args.log, &output)
        .with_context(|| format!("converting {}", args.log.display()))?;
    eprintln!("Log data has been successfully converted to {}", output.display());

    if args.summary.is_none() && !args.json {
        return Ok(());
    }

    let stats = summarize(&records);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    if let Some(path) = &args.summary {
        update_section(path, &args.title, &render_markdown(&stats))
            .with_context(|| format!("updating {}", path.display()))?;
        tracing::info!(path = %path.display(), endpoints = stats.len(), "summary written");
    }
    Ok(())
}

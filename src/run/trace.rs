//! The whole CLI run: load URLs, analyze them, print results.

use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::analyzer::Analyzer;
use super::batch::{load_urls, run_batch, BatchSummary};
use crate::app::{print_error_statistics, print_simple_summary};
use crate::config::Config;
use crate::error_handling::ProcessingStats;

/// Results of a CLI run.
#[derive(Debug, Clone)]
pub struct TraceReport {
    pub summary: BatchSummary,
    pub elapsed_seconds: f64,
}

/// Runs the batch described by `config`, writing one JSON result per line to `out`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the HTTP client cannot be
/// built. Per-URL failures are reported in the output instead.
pub async fn run_trace<W: Write>(
    config: &Config,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<TraceReport> {
    let urls = load_urls(&config.file).await?;
    let analyzer =
        Analyzer::new(&config.user_agent).context("Failed to initialize HTTP client")?;
    let stats = ProcessingStats::new();
    let start_time = Instant::now();

    info!("Analyzing {} URL(s) in {:?} mode", urls.len(), config.mode);
    let summary = run_batch(
        &analyzer,
        &urls,
        config.mode,
        config,
        &stats,
        cancel,
        |result| match serde_json::to_string(result) {
            Ok(line) => {
                if let Err(e) = writeln!(out, "{}", line) {
                    warn!("Failed to write result for {}: {}", result.original_url, e);
                }
            }
            Err(e) => warn!("Failed to serialize result for {}: {}", result.original_url, e),
        },
    )
    .await;
    out.flush().context("Failed to flush output")?;

    let elapsed_seconds = start_time.elapsed().as_secs_f64();
    if config.show_stats {
        print_error_statistics(&stats);
    }
    print_simple_summary(
        summary.total_urls,
        summary.successful,
        summary.failed,
        elapsed_seconds,
    );

    Ok(TraceReport {
        summary,
        elapsed_seconds,
    })
}

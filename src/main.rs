//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `redirect_trace` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Ctrl-C handling (the batch stops between URLs)
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::process;
use tokio_util::sync::CancellationToken;

use redirect_trace::initialization::init_logger_with;
use redirect_trace::{run_trace, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted; finishing the current URL before stopping");
                on_signal.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let mut stdout = std::io::stdout().lock();
    match run_trace(&config, &cancel, &mut stdout).await {
        Ok(report) => {
            if report.summary.cancelled {
                info!("{} URL(s) were not analyzed", report.summary.skipped);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("redirect_trace error: {:#}", e);
            process::exit(1);
        }
    }
}

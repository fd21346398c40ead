//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_DELAY_BETWEEN_REQUESTS_MS, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS,
    DEFAULT_USER_AGENT,
};
use crate::models::{AnalysisSettings, DetectionMode};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Source of analysis settings.
///
/// The engine never hard-codes timeouts or hop limits; it asks a provider.
/// `Config` is the provider used by the CLI, and `AnalysisSettings` provides itself.
pub trait SettingsProvider {
    /// Returns the settings to use for the next analysis.
    fn settings(&self) -> AnalysisSettings;
}

impl SettingsProvider for AnalysisSettings {
    fn settings(&self) -> AnalysisSettings {
        self.clone()
    }
}

/// Application configuration and command-line options.
///
/// # Examples
///
/// ```bash
/// # Network-only analysis of a URL list
/// redirect_trace urls.txt
///
/// # Observe pages for refresh directives and script navigation
/// redirect_trace urls.txt --mode observed --max-redirects 5
///
/// # Read URLs from stdin
/// cat urls.txt | redirect_trace -
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "redirect_trace",
    about = "Follows URLs to their final destination and reports the redirect chain."
)]
pub struct Config {
    /// File to read URLs from (`-` for stdin)
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Detection mode: network-only|observed
    #[arg(long, value_enum, default_value_t = DetectionMode::NetworkOnly)]
    pub mode: DetectionMode,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Maximum number of redirect hops to follow
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Delay between URLs in a batch, in milliseconds
    #[arg(long = "delay-ms", default_value_t = DEFAULT_DELAY_BETWEEN_REQUESTS_MS)]
    pub delay_between_requests_ms: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Print error/info counters at the end of the run
    #[arg(long)]
    pub show_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("urls.txt"),
            mode: DetectionMode::NetworkOnly,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            delay_between_requests_ms: DEFAULT_DELAY_BETWEEN_REQUESTS_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            show_stats: false,
        }
    }
}

impl SettingsProvider for Config {
    fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            timeout_ms: self.timeout_ms,
            max_redirects: self.max_redirects,
            delay_between_requests_ms: self.delay_between_requests_ms,
        }
    }
}

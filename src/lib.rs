//! redirect_trace library: follows URLs to their true destination
//!
//! An analysis follows HTTP redirects hop by hop and, in observed mode, loads the
//! landing page to catch redirects a plain request never sees: refresh
//! directives and script-initiated navigation. Both sources are merged into one
//! ordered chain with loop, mixed-mechanism, domain, and protocol flags.
//!
//! # Example
//!
//! ```no_run
//! use redirect_trace::models::{AnalysisRequest, AnalysisSettings, DetectionMode};
//! use redirect_trace::run::Analyzer;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = Analyzer::new(redirect_trace::config::DEFAULT_USER_AGENT)?;
//! let request = AnalysisRequest::new(
//!     "http://example.com/",
//!     DetectionMode::Observed,
//!     AnalysisSettings::default(),
//! );
//! let result = analyzer.analyze(&request).await;
//! println!("{} -> {} in {} step(s)", result.original_url, result.final_url, result.steps.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod app;
pub mod chain;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod filter;
pub mod initialization;
pub mod models;
pub mod normalize;
pub mod observer;
pub mod record;
pub mod run;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, SettingsProvider};
pub use error_handling::{AnalysisError, ProcessingStats};
pub use models::{
    AnalysisRequest, AnalysisSettings, DetectionMode, Mechanism, RedirectChainResult,
    RedirectStep,
};
pub use run::{analyze, run_trace, Analyzer, TraceReport};

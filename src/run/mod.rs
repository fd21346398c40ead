//! Analysis drivers.
//!
//! - `Analyzer` runs one analysis: affiliate filter, HTTP follower, optional
//!   page observation, chain merge, result assembly.
//! - `run_batch` drives a list of URLs sequentially with a delay between slots.
//! - `run_trace` is the CLI run: input file in, JSON lines out.

mod analyzer;
mod batch;
mod trace;

pub use analyzer::{analyze, AnalysisReport, Analyzer};
pub use batch::{load_urls, read_urls, run_batch, BatchSummary};
pub use trace::{run_trace, TraceReport};

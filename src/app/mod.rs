//! Host-side helpers used by the batch driver.
//!
//! This module provides progress logging, shutdown handling, and statistics
//! printing.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::shutdown_gracefully;
pub use statistics::{print_error_statistics, print_simple_summary};

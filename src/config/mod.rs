//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, observer timing)
//! - CLI option types and parsing
//! - The `SettingsProvider` seam consumed by the analysis engine

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, SettingsProvider};

//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the application,
//! including timeouts, hop limits, and observer timing parameters.

use std::time::Duration;

pub const LOGGING_INTERVAL: usize = 5;

// Analysis defaults (used when the settings provider does not override them)
/// Per-request timeout in milliseconds
/// Each hop is bounded by this timeout; expiry is a hard abort for that request
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Maximum number of HTTP redirect hops to follow
/// Prevents infinite redirect loops and excessive request chains
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
/// Delay between analyses in a batch, in milliseconds
/// Keeps a batch from hammering destination servers
pub const DEFAULT_DELAY_BETWEEN_REQUESTS_MS: u64 = 500;

/// Default User-Agent string for HTTP requests.
///
/// Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Response and body size limits
/// Maximum page body size in bytes (2MB)
/// Documents larger than this are truncated before refresh/script scanning
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;

// Page observer timing
/// How long the caller waits for the observer to answer a request
/// Replies arriving after this are discarded
pub const OBSERVER_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
/// Location polling interval while a refresh directive is pending
pub const URGENT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Location polling interval when nothing is pending
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Extra wait after a refresh directive's delay before re-checking the location
pub const REFRESH_TIMER_BUFFER: Duration = Duration::from_millis(250);
/// Time given to in-flight heuristics after the page settles, before results are collected
pub const OBSERVER_SETTLE_TIME: Duration = Duration::from_millis(100);
/// Maximum number of inline scripts scanned per document
pub const MAX_SCRIPTS_SCANNED: usize = 64;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

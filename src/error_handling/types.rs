//! Error type definitions.
//!
//! This module defines the analysis error taxonomy plus the error, warning, and
//! info types counted during a batch.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Terminal outcomes of a single URL's analysis.
///
/// None of these abort a batch. They surface on the result as `error`,
/// `hasLoop`, or `blocked` rather than bubbling up to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Request failed, timed out, or the redirect target could not be used.
    #[error("{kind}: {message}")]
    Network { kind: ErrorType, message: String },

    /// A URL already visited in this chain came up again.
    #[error("Redirect loop detected at {0}")]
    LoopDetected(String),

    /// The configured number of redirect hops was used up.
    #[error("Redirect hop limit of {0} reached")]
    HopLimitReached(usize),

    /// The URL belongs to a known affiliate network or shortener.
    #[error("Blocked by policy: {service}")]
    BlockedByPolicy { service: String },

    /// One observer heuristic could not be installed in the page environment.
    #[error("Heuristic unavailable: {0}")]
    HeuristicUnavailable(String),

    /// Cleaning did not produce a parseable URL.
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    /// The page observer did not answer within the reply timeout.
    #[error("Observer request {correlation_id} timed out after {timeout_ms}ms")]
    ObserverTimeout { correlation_id: u64, timeout_ms: u64 },
}

impl AnalysisError {
    pub fn network(kind: ErrorType, message: impl Into<String>) -> Self {
        AnalysisError::Network {
            kind,
            message: message.into(),
        }
    }

    /// The counter this error should be recorded under, if any.
    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            AnalysisError::Network { kind, .. } => Some(*kind),
            AnalysisError::MalformedUrl(_) => Some(ErrorType::MalformedUrlError),
            AnalysisError::ObserverTimeout { .. } => Some(ErrorType::ObserverTimeoutError),
            _ => None,
        }
    }
}

/// Types of errors that can occur while analyzing a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // HTTP/Network errors
    HttpRequestBuilderError,
    HttpRequestTimeoutError,
    HttpRequestConnectError,
    HttpRequestBodyError,
    HttpRequestOtherError,
    HttpRequestTooManyRequests,
    HttpRequestBotDetectionError, // 403 Forbidden - typically bot detection
    HttpRequestNotFound,          // 404 Not Found
    HttpRequestServerError,       // 5xx
    HttpRequestErrorStatus,       // any other non-2xx/3xx status
    // Redirect handling errors
    MissingLocationHeader,
    InvalidLocationHeader,
    // Input errors
    MalformedUrlError,
    // Page observation errors
    PageLoadError,
    ObserverTimeoutError,
}

/// Types of warnings that can occur while analyzing a URL.
///
/// Warnings indicate reduced coverage that doesn't prevent a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    HeuristicUnavailable, // An observer heuristic could not install
    LateObserverReply,    // Observer answered after the caller gave up
    PendingRefreshUnconfirmed, // A refresh directive never fired within the window
}

/// Types of informational metrics recorded during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    HttpRedirect,       // At least one HTTP redirect in the chain
    HttpsRedirect,      // Chain upgraded from http to https
    MultipleRedirects,  // More than one hop in the chain
    DeclarativeRefresh, // Chain contains a refresh directive hop
    ScriptNavigation,   // Chain contains a script-initiated hop
    MixedMechanisms,    // Chain combines more than one mechanism
    RedirectLoop,       // Chain loops
    HopLimitReached,    // Follower stopped at the hop cap
    BlockedByPolicy,    // Affiliate filter short-circuit
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HttpRequestBuilderError => "HTTP request builder error",
            ErrorType::HttpRequestTimeoutError => "HTTP request timeout error",
            ErrorType::HttpRequestConnectError => "HTTP request connect error",
            ErrorType::HttpRequestBodyError => "HTTP request body error",
            ErrorType::HttpRequestOtherError => "HTTP request other error",
            ErrorType::HttpRequestTooManyRequests => "Too many requests",
            ErrorType::HttpRequestBotDetectionError => "Bot detection (403 Forbidden)",
            ErrorType::HttpRequestNotFound => "Not Found (404)",
            ErrorType::HttpRequestServerError => "Server error (5xx)",
            ErrorType::HttpRequestErrorStatus => "HTTP error status",
            ErrorType::MissingLocationHeader => "Redirect without Location header",
            ErrorType::InvalidLocationHeader => "Unparsable redirect target",
            ErrorType::MalformedUrlError => "Malformed URL",
            ErrorType::PageLoadError => "Page load error",
            ErrorType::ObserverTimeoutError => "Observer timeout",
        }
    }
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::HeuristicUnavailable => "Heuristic unavailable",
            WarningType::LateObserverReply => "Late observer reply discarded",
            WarningType::PendingRefreshUnconfirmed => "Refresh directive never fired",
        }
    }
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::HttpRedirect => "HTTP redirect",
            InfoType::HttpsRedirect => "HTTP to HTTPS redirect",
            InfoType::MultipleRedirects => "Multiple redirects",
            InfoType::DeclarativeRefresh => "Declarative refresh",
            InfoType::ScriptNavigation => "Script navigation",
            InfoType::MixedMechanisms => "Mixed mechanisms",
            InfoType::RedirectLoop => "Redirect loop",
            InfoType::HopLimitReached => "Hop limit reached",
            InfoType::BlockedByPolicy => "Blocked by policy",
        }
    }
}

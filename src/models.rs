//! Data structures shared across the analysis pipeline.
//!
//! Everything here is part of the wire shape: requests arrive as `AnalysisRequest`
//! and leave as `RedirectChainResult`. Optional fields serialize as explicit `null`
//! so downstream consumers always see the same set of keys.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

use crate::config::{DEFAULT_DELAY_BETWEEN_REQUESTS_MS, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS};

/// How a hop from one URL to the next was performed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIterMacro,
)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// 3xx response with a `Location` header
    Http,
    /// `<meta http-equiv="refresh">` style directive
    DeclarativeRefresh,
    /// Location assignment or navigation call made by page script
    ScriptNavigation,
    /// Fragment-only location change
    HashChange,
    /// Session history manipulation (`pushState`, `replaceState`, `popstate`)
    HistoryNavigation,
}

impl Mechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mechanism::Http => "http",
            Mechanism::DeclarativeRefresh => "declarative_refresh",
            Mechanism::ScriptNavigation => "script_navigation",
            Mechanism::HashChange => "hash_change",
            Mechanism::HistoryNavigation => "history_navigation",
        }
    }

    /// Whether a step of this mechanism moves the browsing context to a new document.
    ///
    /// Hash and history steps change the address bar without loading anything, so
    /// they are not required to link up with the step that follows them.
    pub fn is_chainable(&self) -> bool {
        !matches!(self, Mechanism::HashChange | Mechanism::HistoryNavigation)
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hop in a redirect chain. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectStep {
    pub sequence_index: usize,
    pub source_url: String,
    pub target_url: String,
    pub mechanism: Mechanism,
    pub status_code: Option<u16>,
    pub delay_seconds: Option<u64>,
    pub detection_method: String,
    pub observed_at: DateTime<Utc>,
}

impl RedirectStep {
    pub fn new(
        source_url: impl Into<String>,
        target_url: impl Into<String>,
        mechanism: Mechanism,
        detection_method: &str,
    ) -> Self {
        Self {
            sequence_index: 0,
            source_url: source_url.into(),
            target_url: target_url.into(),
            mechanism,
            status_code: None,
            delay_seconds: None,
            detection_method: detection_method.to_string(),
            observed_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_delay(mut self, delay_seconds: Option<u64>) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }
}

/// A parsed page refresh directive (`"<delay>;url=<target>"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativeRefreshDirective {
    pub delay_seconds: u64,
    pub target_url: String,
    pub detected_at: DateTime<Utc>,
}

/// Why an analysis was short-circuited by the affiliate filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedInfo {
    pub reason: String,
    pub service: String,
    pub suggested_direct_url: Option<String>,
}

/// The final record of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectChainResult {
    pub original_url: String,
    pub final_url: String,
    pub final_status_code: u16,
    pub steps: Vec<RedirectStep>,
    pub has_loop: bool,
    pub has_mixed_mechanisms: bool,
    pub domain_changed: bool,
    pub protocol_upgraded: bool,
    pub blocked: Option<BlockedInfo>,
    pub analysis_duration_ms: u64,
    pub error: Option<String>,
}

/// Whether page-level observation runs in addition to HTTP following.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    /// HTTP redirects only
    #[default]
    NetworkOnly,
    /// HTTP redirects plus refresh directives and script navigation in the landing page
    Observed,
}

/// Timing and limit settings for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub delay_between_requests_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            delay_between_requests_ms: DEFAULT_DELAY_BETWEEN_REQUESTS_MS,
        }
    }
}

impl AnalysisSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// An analysis request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub url: String,
    #[serde(default)]
    pub mode: DetectionMode,
    #[serde(default)]
    pub settings: AnalysisSettings,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>, mode: DetectionMode, settings: AnalysisSettings) -> Self {
        Self {
            url: url.into(),
            mode,
            settings,
        }
    }
}

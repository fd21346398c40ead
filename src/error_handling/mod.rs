//! Error handling and processing statistics.
//!
//! This module provides:
//! - The per-URL analysis error taxonomy (`AnalysisError`)
//! - Error type definitions and categorization
//! - Processing statistics tracking (errors, warnings, info metrics)
//!
//! Error types are categorized into:
//! - **Errors**: Failures that prevent a clean result
//! - **Warnings**: Reduced detection coverage that still yields a result
//! - **Info**: Informational metrics (redirects, loops, mixed chains, etc.)

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_reqwest_error, categorize_status};
pub use stats::ProcessingStats;
pub use types::{AnalysisError, ErrorType, InfoType, InitializationError, WarningType};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mechanism, RedirectChainResult, RedirectStep};
    use strum::IntoEnumIterator;

    fn chain(steps: Vec<RedirectStep>) -> RedirectChainResult {
        RedirectChainResult {
            original_url: "http://a.test/".to_string(),
            final_url: "https://b.test/".to_string(),
            final_status_code: 200,
            steps,
            has_loop: false,
            has_mixed_mechanisms: false,
            domain_changed: true,
            protocol_upgraded: true,
            blocked: None,
            analysis_duration_ms: 1,
            error: None,
        }
    }

    #[test]
    fn test_processing_stats_initialization() {
        let stats = ProcessingStats::new();
        for error_type in ErrorType::iter() {
            assert_eq!(stats.get_error_count(error_type), 0);
        }
        for warning_type in WarningType::iter() {
            assert_eq!(stats.get_warning_count(warning_type), 0);
        }
        for info_type in InfoType::iter() {
            assert_eq!(stats.get_info_count(info_type), 0);
        }
    }

    #[test]
    fn test_processing_stats_totals() {
        let stats = ProcessingStats::new();
        stats.increment_error(ErrorType::HttpRequestTimeoutError);
        stats.increment_error(ErrorType::HttpRequestTimeoutError);
        stats.increment_warning(WarningType::HeuristicUnavailable);
        stats.increment_info(InfoType::HttpRedirect);

        assert_eq!(stats.get_error_count(ErrorType::HttpRequestTimeoutError), 2);
        assert_eq!(stats.total_errors(), 2);
        assert_eq!(stats.total_warnings(), 1);
        assert_eq!(stats.total_info(), 1);
    }

    #[test]
    fn test_record_chain_counts_mechanisms() {
        let stats = ProcessingStats::new();
        let steps = vec![
            RedirectStep::new("http://a.test/", "https://a.test/", Mechanism::Http, "http_location"),
            RedirectStep::new(
                "https://a.test/",
                "https://b.test/",
                Mechanism::DeclarativeRefresh,
                "meta_refresh_timer",
            ),
        ];
        let mut result = chain(steps);
        result.has_mixed_mechanisms = true;
        stats.record_chain(&result);

        assert_eq!(stats.get_info_count(InfoType::HttpRedirect), 1);
        assert_eq!(stats.get_info_count(InfoType::DeclarativeRefresh), 1);
        assert_eq!(stats.get_info_count(InfoType::MultipleRedirects), 1);
        assert_eq!(stats.get_info_count(InfoType::HttpsRedirect), 1);
        assert_eq!(stats.get_info_count(InfoType::MixedMechanisms), 1);
        assert_eq!(stats.get_info_count(InfoType::ScriptNavigation), 0);
    }

    #[test]
    fn test_record_chain_blocked_only_counts_block() {
        let stats = ProcessingStats::new();
        let mut result = chain(Vec::new());
        result.blocked = Some(crate::models::BlockedInfo {
            reason: "affiliate".into(),
            service: "Bitly".into(),
            suggested_direct_url: None,
        });
        stats.record_chain(&result);
        assert_eq!(stats.get_info_count(InfoType::BlockedByPolicy), 1);
        assert_eq!(stats.total_info(), 1);
    }
}

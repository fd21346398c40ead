//! Builder for `RedirectChainResult`.

use std::time::Instant;

use crate::chain::MergedChain;
use crate::error_handling::AnalysisError;
use crate::models::{BlockedInfo, RedirectChainResult};
use crate::normalize::clean_url;

/// Collects the parts of one analysis and builds its result.
///
/// The clock starts when the builder is created, so create it when the
/// request is issued.
#[derive(Debug)]
pub struct ResultBuilder {
    original_url: String,
    started: Instant,
    chain: Option<MergedChain>,
    blocked: Option<BlockedInfo>,
    error: Option<AnalysisError>,
}

impl ResultBuilder {
    pub fn start(original_url: &str) -> Self {
        Self::started_at(original_url, Instant::now())
    }

    pub fn started_at(original_url: &str, started: Instant) -> Self {
        Self {
            original_url: clean_url(original_url),
            started,
            chain: None,
            blocked: None,
            error: None,
        }
    }

    pub fn blocked(mut self, info: BlockedInfo) -> Self {
        self.blocked = Some(info);
        self
    }

    pub fn chain(mut self, chain: MergedChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the terminal error, replacing any error carried by the chain.
    pub fn error(mut self, error: AnalysisError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn build(self) -> RedirectChainResult {
        let analysis_duration_ms =
            u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        // Blocked requests never reach the network
        if let Some(blocked) = self.blocked {
            return RedirectChainResult {
                final_url: self.original_url.clone(),
                original_url: self.original_url,
                final_status_code: 0,
                steps: Vec::new(),
                has_loop: false,
                has_mixed_mechanisms: false,
                domain_changed: false,
                protocol_upgraded: false,
                blocked: Some(blocked),
                analysis_duration_ms,
                error: None,
            };
        }

        match self.chain {
            Some(chain) => {
                let error = self.error.or(chain.error);
                RedirectChainResult {
                    original_url: chain.original_url,
                    final_url: chain.final_url,
                    final_status_code: if error.is_some() {
                        0
                    } else {
                        chain.final_status_code
                    },
                    steps: chain.steps,
                    has_loop: chain.has_loop,
                    has_mixed_mechanisms: chain.has_mixed_mechanisms,
                    domain_changed: chain.domain_changed,
                    protocol_upgraded: chain.protocol_upgraded,
                    blocked: None,
                    analysis_duration_ms,
                    error: error.map(|e| e.to_string()),
                }
            }
            None => RedirectChainResult {
                final_url: self.original_url.clone(),
                original_url: self.original_url,
                final_status_code: 0,
                steps: Vec::new(),
                has_loop: false,
                has_mixed_mechanisms: false,
                domain_changed: false,
                protocol_upgraded: false,
                blocked: None,
                analysis_duration_ms,
                error: self.error.map(|e| e.to_string()),
            },
        }
    }
}

//! Single-URL analysis: filter, follow, observe, merge, build.

use std::time::Duration;

use log::{debug, info, warn};

use crate::chain::merge_chain;
use crate::config::OBSERVER_REPLY_TIMEOUT;
use crate::error_handling::{AnalysisError, InitializationError, WarningType};
use crate::fetch::{follow_redirects, FollowTerminal};
use crate::filter::check_blocklist;
use crate::initialization::init_redirect_client;
use crate::models::{AnalysisRequest, DetectionMode, Mechanism, RedirectChainResult};
use crate::normalize::parse_cleaned;
use crate::observer::{EnvironmentCapabilities, HttpPageLoader, ObserverReport, PageSession};
use crate::record::ResultBuilder;

/// A result together with the typed causes behind it.
///
/// The result only carries an error message; batch statistics need the typed
/// error and the warnings that did not make it into the result.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: RedirectChainResult,
    /// The error carried by `result`, if any
    pub error: Option<AnalysisError>,
    /// Where the HTTP follower stopped; `None` when it never ran
    pub terminal: Option<FollowTerminal>,
    /// Page observation failed; the result was built from HTTP steps alone
    pub observer_error: Option<AnalysisError>,
    pub warnings: Vec<WarningType>,
}

/// Runs analyses with one shared no-redirect client.
#[derive(Debug, Clone)]
pub struct Analyzer {
    client: reqwest::Client,
    capabilities: EnvironmentCapabilities,
    reply_timeout: Duration,
}

impl Analyzer {
    /// Creates an analyzer with its own client.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::HttpClientError` if the client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, InitializationError> {
        Ok(Self::with_client(init_redirect_client(user_agent)?))
    }

    /// Uses an existing client. It must not follow redirects on its own.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            capabilities: EnvironmentCapabilities::default(),
            reply_timeout: OBSERVER_REPLY_TIMEOUT,
        }
    }

    pub fn with_capabilities(mut self, capabilities: EnvironmentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Analyzes one URL. Per-URL failures end up in the result, never in `Err`.
    pub async fn analyze(&self, request: &AnalysisRequest) -> RedirectChainResult {
        self.analyze_with_diagnostics(request).await.result
    }

    /// Analyzes one URL and keeps the typed error and warnings.
    pub async fn analyze_with_diagnostics(&self, request: &AnalysisRequest) -> AnalysisReport {
        let builder = ResultBuilder::start(&request.url);

        if let Some(blocked) = check_blocklist(&request.url) {
            info!(
                "Not following {}: {} ({})",
                request.url, blocked.reason, blocked.service
            );
            return AnalysisReport {
                result: builder.blocked(blocked).build(),
                error: None,
                terminal: None,
                observer_error: None,
                warnings: Vec::new(),
            };
        }

        if let Err(e) = parse_cleaned(&request.url) {
            warn!("{}", e);
            return AnalysisReport {
                result: builder.error(e.clone()).build(),
                error: Some(e),
                terminal: None,
                observer_error: None,
                warnings: Vec::new(),
            };
        }

        let follow = follow_redirects(&self.client, &request.url, &request.settings).await;
        debug!(
            "Follower stopped at {} after {} hops ({:?})",
            follow.final_url,
            follow.steps.len(),
            follow.terminal
        );

        let mut warnings = Vec::new();
        let mut observer_error = None;
        let observe = request.mode == DetectionMode::Observed
            && matches!(
                follow.terminal,
                FollowTerminal::Success | FollowTerminal::Erroring
            );
        let report: Option<ObserverReport> = if observe {
            let loader = HttpPageLoader::new(self.client.clone(), request.settings.timeout());
            let http_hops = follow
                .steps
                .iter()
                .filter(|s| s.mechanism == Mechanism::Http)
                .count();
            let session = PageSession::new(&loader, &request.settings)
                .with_capabilities(self.capabilities)
                .with_reply_timeout(self.reply_timeout)
                .with_http_budget(request.settings.max_redirects.saturating_sub(http_hops));
            match session.observe(&follow.final_url).await {
                Ok(observation) => {
                    warnings.extend(
                        observation
                            .report
                            .unavailable_heuristics
                            .iter()
                            .map(|_| WarningType::HeuristicUnavailable),
                    );
                    warnings.extend(
                        std::iter::repeat(WarningType::LateObserverReply)
                            .take(observation.late_replies),
                    );
                    if observation.refresh_unconfirmed {
                        warnings.push(WarningType::PendingRefreshUnconfirmed);
                    }
                    for note in &observation.report.diagnostics {
                        debug!("{}: {}", request.url, note);
                    }
                    if let Some(e) = observation.load_error {
                        debug!("Page environment stopped early for {}: {}", request.url, e);
                        if follow.error.is_none() {
                            observer_error = Some(e);
                        }
                    }
                    Some(observation.report)
                }
                Err(e) => {
                    warn!("Page observation of {} failed: {}", follow.final_url, e);
                    observer_error = Some(e);
                    None
                }
            }
        } else {
            None
        };

        let error = follow.error.clone();
        let terminal = follow.terminal;
        let merged = merge_chain(&request.url, &follow, report.as_ref());
        AnalysisReport {
            result: builder.chain(merged).build(),
            error,
            terminal: Some(terminal),
            observer_error,
            warnings,
        }
    }
}

/// Analyzes one URL with a fresh client and the default user agent.
///
/// Prefer `Analyzer` when analyzing more than one URL.
pub async fn analyze(request: &AnalysisRequest) -> RedirectChainResult {
    match Analyzer::new(crate::config::DEFAULT_USER_AGENT) {
        Ok(analyzer) => analyzer.analyze(request).await,
        Err(e) => {
            warn!("{}", e);
            ResultBuilder::start(&request.url)
                .error(AnalysisError::network(
                    crate::error_handling::ErrorType::HttpRequestBuilderError,
                    e.to_string(),
                ))
                .build()
        }
    }
}

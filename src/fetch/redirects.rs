//! HTTP redirect chain resolution.
//!
//! This module follows redirect chains manually, one hop at a time, so every
//! intermediate URL, status code, and the reason the walk stopped are captured.

use std::collections::HashSet;

use log::{debug, warn};
use reqwest::Url;

use crate::chain::ChainFlags;
use crate::error_handling::{categorize_status, AnalysisError, ErrorType};
use crate::fetch::request::probe;
use crate::models::{AnalysisSettings, Mechanism, RedirectStep};
use crate::normalize::{clean_url, comparison_key};

/// Detection method recorded on steps produced by the follower.
pub const HTTP_LOCATION_METHOD: &str = "http_location";

/// Normalized URLs already requested during one traversal.
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL. Returns `false` if it was already present.
    pub fn insert(&mut self, url: &str) -> bool {
        self.keys.insert(comparison_key(url))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.keys.contains(&comparison_key(url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Where the follower's state machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowTerminal {
    /// A 2xx response was reached
    Success,
    /// The next hop pointed at an already visited URL
    LoopDetected,
    /// The configured number of redirects was used up
    HopLimitReached,
    /// Network failure, error status, or unusable `Location`
    Erroring,
}

/// Everything the follower learned about one URL.
#[derive(Debug, Clone)]
pub struct FollowOutcome {
    pub start_url: String,
    pub final_url: String,
    /// Last status received; 0 when the walk ended in `Erroring`
    pub final_status: u16,
    pub steps: Vec<RedirectStep>,
    pub terminal: FollowTerminal,
    pub domain_changed: bool,
    pub protocol_upgraded: bool,
    pub error: Option<AnalysisError>,
}

impl FollowOutcome {
    pub fn loop_detected(&self) -> bool {
        self.terminal == FollowTerminal::LoopDetected
    }

    /// Whether a document is expected at `final_url`.
    pub fn landed(&self) -> bool {
        self.terminal == FollowTerminal::Success
    }
}

struct Walk {
    start_url: String,
    current: String,
    last_status: u16,
    steps: Vec<RedirectStep>,
    flags: ChainFlags,
}

impl Walk {
    fn finish(self, terminal: FollowTerminal, error: Option<AnalysisError>) -> FollowOutcome {
        let final_status = if terminal == FollowTerminal::Erroring {
            0
        } else {
            self.last_status
        };
        FollowOutcome {
            start_url: self.start_url,
            final_url: self.current,
            final_status,
            steps: self.steps,
            terminal,
            domain_changed: self.flags.domain_changed(),
            protocol_upgraded: self.flags.protocol_upgraded(),
            error,
        }
    }
}

/// Resolves a `Location` header against the URL that returned it.
fn resolve_location(current: &str, location: &str) -> Result<String, AnalysisError> {
    Url::parse(location)
        .or_else(|_| Url::parse(current).and_then(|base| base.join(location)))
        .map(|u| u.to_string())
        .map_err(|e| {
            AnalysisError::network(
                ErrorType::InvalidLocationHeader,
                format!("Location '{}' from {} is not a valid URL: {}", location, current, e),
            )
        })
}

/// Follows HTTP redirects for a URL until success, loop, hop limit, or error.
///
/// # Arguments
///
/// * `client` - HTTP client with redirects disabled (for manual tracking)
/// * `start_url` - The initial URL; cleaned before the first request
/// * `settings` - Supplies the per-request timeout and the hop limit
///
/// Requests are strictly sequential. Every failure is captured in the outcome
/// rather than returned as `Err`, so callers always get the partial chain.
pub async fn follow_redirects(
    client: &reqwest::Client,
    start_url: &str,
    settings: &AnalysisSettings,
) -> FollowOutcome {
    let start = clean_url(start_url);
    let mut visited = VisitedSet::new();
    let mut walk = Walk {
        start_url: start.clone(),
        current: start.clone(),
        last_status: 0,
        steps: Vec::new(),
        flags: ChainFlags::new(&start),
    };
    let timeout = settings.timeout();
    let mut hops = 0usize;

    loop {
        let candidate = clean_url(&walk.current);
        if !visited.insert(&candidate) {
            debug!("Redirect loop: {} was already visited", candidate);
            return walk.finish(FollowTerminal::LoopDetected, None);
        }

        debug!("Requesting {}", candidate);
        let response = match probe(client, &candidate, timeout).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request for {} failed: {}", candidate, e);
                return walk.finish(FollowTerminal::Erroring, Some(e));
            }
        };
        walk.last_status = response.status.as_u16();

        if response.status.is_success() {
            debug!("{} answered {}", candidate, response.status);
            return walk.finish(FollowTerminal::Success, None);
        }

        if !response.status.is_redirection() {
            let error = AnalysisError::network(
                categorize_status(response.status),
                format!("{} returned {}", candidate, response.status),
            );
            warn!("{}", error);
            return walk.finish(FollowTerminal::Erroring, Some(error));
        }

        let Some(location) = response.location else {
            warn!(
                "Redirect status {} for {} but no Location header",
                response.status, candidate
            );
            let error = AnalysisError::network(
                ErrorType::MissingLocationHeader,
                format!("{} returned {} without Location", candidate, response.status),
            );
            return walk.finish(FollowTerminal::Erroring, Some(error));
        };

        if hops >= settings.max_redirects {
            return walk.finish(FollowTerminal::HopLimitReached, None);
        }

        let target = match resolve_location(&candidate, &location) {
            Ok(target) => target,
            Err(e) => {
                warn!("{}", e);
                return walk.finish(FollowTerminal::Erroring, Some(e));
            }
        };

        walk.steps.push(
            RedirectStep::new(&candidate, &target, Mechanism::Http, HTTP_LOCATION_METHOD)
                .with_status(walk.last_status),
        );
        walk.flags.observe(&target);
        walk.current = target;
        hops += 1;

        if hops >= settings.max_redirects {
            debug!(
                "Hop limit of {} reached at {}",
                settings.max_redirects, walk.current
            );
            return walk.finish(FollowTerminal::HopLimitReached, None);
        }
    }
}

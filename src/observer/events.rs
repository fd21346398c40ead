//! Messages flowing from the page environment into the observer.

use super::document::PageDocument;
use super::interceptor::InterceptedCall;
use super::refresh::ParsedRefresh;

/// Something that happened in the page environment.
///
/// Events that accompany a location change carry the location as it was when
/// the event fired, so the observer never depends on how far the environment
/// has moved on by the time the event is handled.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// A document finished loading at `location`
    Loaded {
        location: String,
        status: u16,
        document: PageDocument,
    },
    /// A script added a refresh directive to the live document
    StructureChanged { directive: ParsedRefresh },
    /// The page became visible again (timers in background tabs may have been throttled)
    VisibilityRegained { document: PageDocument },
    /// The document is about to unload; `location` is where the browsing context is going
    BeforeUnload { location: String },
    HashChanged { old_url: String, new_url: String },
    PopState { location: String },
    /// An installed interceptor saw a navigation call
    NavigationIntercepted(InterceptedCall),
    /// The environment's own document request was redirected at the HTTP level
    HttpHop { from: String, to: String, status: u16 },
    /// A heuristic could not be installed in this environment
    HeuristicUnavailable { name: String },
}

/// Which heuristic noticed a location change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RefreshTimer,
    Unload,
    HashEvent,
    PopStateEvent,
    Intercept { history: bool },
    LocationPoll,
    Load,
    Http,
    EvidenceAnalysis,
    SimilarityAnalysis,
}

impl Trigger {
    /// The stable `detectionMethod` string recorded on steps.
    pub fn detection_method(&self) -> &'static str {
        match self {
            Trigger::RefreshTimer => "meta_refresh_timer",
            Trigger::Unload => "unload_event",
            Trigger::HashEvent => "hashchange_event",
            Trigger::PopStateEvent => "popstate_event",
            Trigger::Intercept { .. } => "property_intercept",
            Trigger::LocationPoll => "location_poll",
            Trigger::Load => "load_event",
            Trigger::Http => "http_location",
            Trigger::EvidenceAnalysis => "evidence_analysis",
            Trigger::SimilarityAnalysis => "similarity_analysis",
        }
    }

    /// Whether the trigger itself proves a session history navigation.
    pub fn is_history(&self) -> bool {
        matches!(
            self,
            Trigger::PopStateEvent | Trigger::Intercept { history: true }
        )
    }
}

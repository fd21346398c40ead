//! Detection state owned by the observer actor.

use chrono::Utc;
use serde::Serialize;

use super::refresh::ParsedRefresh;
use crate::models::{DeclarativeRefreshDirective, RedirectStep};
use crate::normalize::same_url;

/// What the observer learned about one page session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverReport {
    /// Candidate steps in the order they were confirmed
    pub steps: Vec<RedirectStep>,
    /// The authoritative refresh directive of the last page load, if any
    pub refresh: Option<DeclarativeRefreshDirective>,
    pub final_location: String,
    /// Status of the last document that loaded
    pub final_status: Option<u16>,
    pub title: Option<String>,
    pub diagnostics: Vec<String>,
    pub unavailable_heuristics: Vec<String>,
}

/// Single-writer detection state. Only the actor touches it.
#[derive(Debug)]
pub struct DetectionState {
    pub last_known_location: String,
    pub steps: Vec<RedirectStep>,
    /// Authoritative directive for the current page load
    pub refresh: Option<DeclarativeRefreshDirective>,
    /// Whether `refresh` has yet to be seen taking effect
    pub refresh_pending: bool,
    /// Bumped whenever `refresh` is replaced, so stale timers can be ignored
    pub refresh_generation: u64,
    /// Every distinct directive seen during the session
    pub refresh_history: Vec<DeclarativeRefreshDirective>,
    pub final_status: Option<u16>,
    pub title: Option<String>,
    pub diagnostics: Vec<String>,
    pub unavailable_heuristics: Vec<String>,
}

impl DetectionState {
    pub fn new(start_url: &str) -> Self {
        Self {
            last_known_location: start_url.to_string(),
            steps: Vec::new(),
            refresh: None,
            refresh_pending: false,
            refresh_generation: 0,
            refresh_history: Vec::new(),
            final_status: None,
            title: None,
            diagnostics: Vec::new(),
            unavailable_heuristics: Vec::new(),
        }
    }

    /// Starts a new page load: the previous page's directive no longer applies.
    pub fn begin_page(&mut self, status: u16, title: Option<String>) {
        self.final_status = Some(status);
        self.refresh = None;
        self.refresh_pending = false;
        self.refresh_generation += 1;
        self.title = title;
    }

    /// Records a directive finding.
    ///
    /// Returns the new generation when the directive is new or changed and a
    /// confirmation timer should be armed. A repeated detection of the same
    /// directive only refreshes its timestamp.
    pub fn record_directive(&mut self, parsed: &ParsedRefresh) -> Option<u64> {
        if let Some(current) = self.refresh.as_mut() {
            if current.delay_seconds == parsed.delay_seconds
                && same_url(&current.target_url, &parsed.target_url)
            {
                current.detected_at = Utc::now();
                return None;
            }
        }

        let directive = DeclarativeRefreshDirective {
            delay_seconds: parsed.delay_seconds,
            target_url: parsed.target_url.clone(),
            detected_at: Utc::now(),
        };
        if !self
            .refresh_history
            .iter()
            .any(|d| d.delay_seconds == directive.delay_seconds && same_url(&d.target_url, &directive.target_url))
        {
            self.refresh_history.push(directive.clone());
        }
        self.refresh = Some(directive);
        self.refresh_pending = true;
        self.refresh_generation += 1;
        Some(self.refresh_generation)
    }

    /// The pending directive, if the given URL is its target.
    pub fn pending_directive_for(&self, url: &str) -> Option<&DeclarativeRefreshDirective> {
        self.refresh
            .as_ref()
            .filter(|d| self.refresh_pending && same_url(&d.target_url, url))
    }

    pub fn push_step(&mut self, mut step: RedirectStep) {
        step.sequence_index = self.steps.len();
        self.last_known_location = step.target_url.clone();
        self.steps.push(step);
    }

    pub fn note_unavailable(&mut self, name: &str) {
        if !self.unavailable_heuristics.iter().any(|n| n == name) {
            self.unavailable_heuristics.push(name.to_string());
        }
    }

    pub fn report(&self) -> ObserverReport {
        ObserverReport {
            steps: self.steps.clone(),
            refresh: self.refresh.clone(),
            final_location: self.last_known_location.clone(),
            final_status: self.final_status,
            title: self.title.clone(),
            diagnostics: self.diagnostics.clone(),
            unavailable_heuristics: self.unavailable_heuristics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mechanism;

    fn parsed(delay: u64, target: &str) -> ParsedRefresh {
        ParsedRefresh {
            delay_seconds: delay,
            target_url: target.to_string(),
        }
    }

    #[test]
    fn test_repeated_directive_does_not_rearm() {
        let mut state = DetectionState::new("http://c.test/");
        let first = state.record_directive(&parsed(0, "http://d.test/"));
        assert!(first.is_some());
        assert_eq!(state.record_directive(&parsed(0, "http://D.test")), None);
        assert_eq!(state.refresh_history.len(), 1);
    }

    #[test]
    fn test_changed_directive_replaces_authoritative_one() {
        let mut state = DetectionState::new("http://c.test/");
        let first = state.record_directive(&parsed(5, "http://d.test/")).expect("armed");
        let second = state.record_directive(&parsed(1, "http://e.test/")).expect("armed");
        assert!(second > first);
        assert_eq!(
            state.refresh.as_ref().map(|d| d.target_url.as_str()),
            Some("http://e.test/")
        );
        assert_eq!(state.refresh_history.len(), 2);
        assert!(state.pending_directive_for("http://e.test/").is_some());
        assert!(state.pending_directive_for("http://d.test/").is_none());
    }

    #[test]
    fn test_new_page_clears_directive_but_keeps_history() {
        let mut state = DetectionState::new("http://c.test/");
        state.record_directive(&parsed(0, "http://d.test/"));
        state.begin_page(200, Some("Next".to_string()));
        assert_eq!(state.final_status, Some(200));
        assert!(state.refresh.is_none());
        assert!(!state.refresh_pending);
        assert_eq!(state.refresh_history.len(), 1);
        assert_eq!(state.title.as_deref(), Some("Next"));
    }

    #[test]
    fn test_push_step_numbers_and_moves_location() {
        let mut state = DetectionState::new("http://c.test/");
        state.push_step(RedirectStep::new(
            "http://c.test/",
            "http://d.test/",
            Mechanism::ScriptNavigation,
            "unload_event",
        ));
        state.push_step(RedirectStep::new(
            "http://d.test/",
            "http://d.test/#x",
            Mechanism::HashChange,
            "hashchange_event",
        ));
        assert_eq!(state.steps[1].sequence_index, 1);
        assert_eq!(state.last_known_location, "http://d.test/#x");
        assert_eq!(state.report().final_location, "http://d.test/#x");
    }

    #[test]
    fn test_unavailable_heuristics_are_unique() {
        let mut state = DetectionState::new("http://c.test/");
        state.note_unavailable("history_api");
        state.note_unavailable("history_api");
        assert_eq!(state.unavailable_heuristics, vec!["history_api".to_string()]);
    }
}

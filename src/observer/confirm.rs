//! Retrospective confirmation run when the observer finishes.
//!
//! Live heuristics can miss a refresh (a throttled timer, a navigation that
//! outran the event monitors). Once the page has settled, the final location is
//! compared against every directive seen during the session.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::events::Trigger;
use super::state::DetectionState;
use crate::models::{DeclarativeRefreshDirective, Mechanism, RedirectStep};
use crate::normalize::{clean_url, same_url};

static REDIRECT_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(redirect(ing|ed)?|moved|forwarding|one moment)\b")
        .expect("Invalid redirect title regex")
});

fn parse(raw: &str) -> Option<Url> {
    Url::parse(&clean_url(raw)).ok()
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Last path segment without its extension, lower-cased.
fn file_stem(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let stem = segment.rsplit_once('.').map_or(segment, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_ascii_lowercase())
}

/// Origin and path are identical. Query and fragment are ignored.
pub fn is_exact_target_match(location: &str, target: &str) -> bool {
    match (parse(location), parse(target)) {
        (Some(location), Some(target)) => {
            same_origin(&location, &target) && location.path() == target.path()
        }
        _ => false,
    }
}

/// Same origin, and one path is a directory prefix of the other.
pub fn is_path_prefix_match(location: &str, target: &str) -> bool {
    let (Some(location), Some(target)) = (parse(location), parse(target)) else {
        return false;
    };
    if !same_origin(&location, &target) || target.path() == "/" || location.path() == "/" {
        return false;
    }
    let is_dir_prefix = |longer: &str, shorter: &str| {
        let shorter = shorter.trim_end_matches('/');
        longer.starts_with(shorter)
            && longer[shorter.len()..].starts_with('/')
    };
    is_dir_prefix(location.path(), target.path()) || is_dir_prefix(target.path(), location.path())
}

/// Same origin, and the last path segments name the same file.
pub fn is_filename_similar(location: &str, target: &str) -> bool {
    let (Some(location), Some(target)) = (parse(location), parse(target)) else {
        return false;
    };
    if !same_origin(&location, &target) {
        return false;
    }
    match (file_stem(&location), file_stem(&target)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn already_declared(state: &DetectionState, location: &str) -> bool {
    state
        .steps
        .iter()
        .any(|s| s.mechanism == Mechanism::DeclarativeRefresh && same_url(&s.target_url, location))
}

/// Source of the latest step that landed on `location`, if one exists.
fn arrival_source(state: &DetectionState, location: &str) -> Option<String> {
    state
        .steps
        .iter()
        .rev()
        .find(|s| same_url(&s.target_url, location))
        .map(|s| s.source_url.clone())
}

fn synthesize(
    state: &mut DetectionState,
    directive: &DeclarativeRefreshDirective,
    source: String,
    trigger: Trigger,
) {
    let location = state.last_known_location.clone();
    log::debug!(
        "{} attributes arrival at {} to refresh directive for {}",
        trigger.detection_method(),
        location,
        directive.target_url
    );
    state.push_step(
        RedirectStep::new(
            source,
            location,
            Mechanism::DeclarativeRefresh,
            trigger.detection_method(),
        )
        .with_delay(Some(directive.delay_seconds)),
    );
    if state.refresh.as_ref() == Some(directive) {
        state.refresh_pending = false;
    }
}

/// Evidence analysis: the final location is exactly a directive's target.
pub fn evidence_analysis(state: &mut DetectionState) -> bool {
    let location = state.last_known_location.clone();
    if already_declared(state, &location) {
        return false;
    }
    let Some(source) = arrival_source(state, &location) else {
        return false;
    };
    let Some(directive) = state
        .refresh_history
        .iter()
        .rev()
        .find(|d| is_exact_target_match(&location, &d.target_url))
        .cloned()
    else {
        return false;
    };
    synthesize(state, &directive, source, Trigger::EvidenceAnalysis);
    true
}

/// Similarity analysis: the final location resembles a directive's target.
pub fn similarity_analysis(state: &mut DetectionState) -> bool {
    let location = state.last_known_location.clone();
    if already_declared(state, &location) {
        return false;
    }
    let Some(source) = arrival_source(state, &location) else {
        return false;
    };
    let Some(directive) = state
        .refresh_history
        .iter()
        .rev()
        .find(|d| {
            is_path_prefix_match(&location, &d.target_url)
                || is_filename_similar(&location, &d.target_url)
        })
        .cloned()
    else {
        return false;
    };
    synthesize(state, &directive, source, Trigger::SimilarityAnalysis);
    true
}

/// Diagnostic only: a title that announces a redirect nobody observed.
pub fn title_diagnostic(title: Option<&str>, step_count: usize) -> Option<String> {
    let title = title?;
    if step_count == 0 && REDIRECT_TITLE_RE.is_match(title) {
        Some(format!(
            "Page title \"{}\" suggests a redirect, but no navigation was observed",
            title
        ))
    } else {
        None
    }
}

/// Runs every retrospective check in order. Each check is independent.
pub fn confirm_retrospectively(state: &mut DetectionState) {
    if !evidence_analysis(state) {
        similarity_analysis(state);
    }
    if state.refresh_pending {
        if let Some(directive) = &state.refresh {
            let note = format!(
                "Refresh directive to {} (delay {}s) never took effect",
                directive.target_url, directive.delay_seconds
            );
            state.diagnostics.push(note);
        }
    }
    if let Some(note) = title_diagnostic(state.title.as_deref(), state.steps.len()) {
        state.diagnostics.push(note);
    }
}

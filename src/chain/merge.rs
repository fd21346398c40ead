//! Merging follower and observer output into one chain.

use log::debug;

use super::flags::ChainFlags;
use crate::error_handling::AnalysisError;
use crate::fetch::FollowOutcome;
use crate::models::{Mechanism, RedirectStep};
use crate::normalize::{clean_url, comparison_key, differs_only_by_fragment, same_url};
use crate::observer::ObserverReport;

/// Detection method of the step that reconciles the chain tail with the final location.
pub const FINAL_LOCATION_METHOD: &str = "final_location";

/// The merged, renumbered chain for one analysis.
#[derive(Debug, Clone)]
pub struct MergedChain {
    pub original_url: String,
    pub steps: Vec<RedirectStep>,
    pub final_url: String,
    pub final_status_code: u16,
    pub has_loop: bool,
    pub has_mixed_mechanisms: bool,
    pub domain_changed: bool,
    pub protocol_upgraded: bool,
    pub error: Option<AnalysisError>,
}

/// Moves delayed declarative steps ahead of script steps that share a source.
///
/// Both heuristics can fire for the same hop; the refresh directive is the
/// cause, the script-side event only its symptom.
fn order_observer_steps(steps: &[RedirectStep]) -> Vec<RedirectStep> {
    let is_delayed_refresh =
        |s: &RedirectStep| s.mechanism == Mechanism::DeclarativeRefresh && s.delay_seconds.is_some();

    let mut ordered = Vec::with_capacity(steps.len());
    let mut start = 0;
    while start < steps.len() {
        let key = comparison_key(&steps[start].source_url);
        let end = steps[start..]
            .iter()
            .position(|s| comparison_key(&s.source_url) != key)
            .map_or(steps.len(), |offset| start + offset);
        let run = &steps[start..end];

        let has_script = run.iter().any(|s| s.mechanism == Mechanism::ScriptNavigation);
        if has_script && run.iter().any(is_delayed_refresh) {
            ordered.extend(run.iter().filter(|s| is_delayed_refresh(s)).cloned());
            ordered.extend(run.iter().filter(|s| !is_delayed_refresh(s)).cloned());
        } else {
            ordered.extend(run.iter().cloned());
        }
        start = end;
    }
    ordered
}

/// Appends an observer candidate, collapsing it into the tail when both
/// describe the same hop.
fn push_candidate(steps: &mut Vec<RedirectStep>, observer_from: usize, candidate: RedirectStep) {
    if candidate.mechanism != Mechanism::Http {
        let tail_is_observer = steps.len() > observer_from;
        if let Some(tail) = steps.last_mut() {
            if same_url(&tail.target_url, &candidate.target_url) {
                if tail_is_observer
                    && tail.mechanism == Mechanism::ScriptNavigation
                    && candidate.mechanism == Mechanism::DeclarativeRefresh
                {
                    debug!("Declarative detection replaces script detection of {}", tail.target_url);
                    tail.mechanism = candidate.mechanism;
                    tail.detection_method = candidate.detection_method;
                    tail.delay_seconds = candidate.delay_seconds;
                } else {
                    debug!("Dropping duplicate detection of {}", candidate.target_url);
                }
                return;
            }
        }
    }
    steps.push(candidate);
}

/// Points each observer step at the URL the browsing context was really on.
fn relink(original_url: &str, steps: &mut [RedirectStep], observer_from: usize) {
    let mut anchor = original_url.to_string();
    let mut previous = original_url.to_string();
    for (index, step) in steps.iter_mut().enumerate() {
        if index >= observer_from {
            step.source_url = if step.mechanism.is_chainable() {
                anchor.clone()
            } else {
                previous.clone()
            };
        }
        if step.mechanism.is_chainable() {
            anchor = step.target_url.clone();
        }
        previous = step.target_url.clone();
    }
}

/// Whether any URL appears twice in `{original} ∪ targets`.
fn has_repeated_url(original_url: &str, steps: &[RedirectStep]) -> bool {
    let mut seen = std::collections::HashSet::new();
    seen.insert(comparison_key(original_url));
    steps
        .iter()
        .any(|step| !seen.insert(comparison_key(&step.target_url)))
}

fn has_mixed_mechanisms(steps: &[RedirectStep]) -> bool {
    let mut mechanisms = steps.iter().map(|s| s.mechanism);
    match mechanisms.next() {
        Some(first) => mechanisms.any(|m| m != first),
        None => false,
    }
}

/// Merges HTTP follower output with what the page observer saw.
pub fn merge_chain(
    original_url: &str,
    follow: &FollowOutcome,
    observer: Option<&ObserverReport>,
) -> MergedChain {
    let original_url = clean_url(original_url);
    let mut steps = follow.steps.clone();
    let observer_from = steps.len();

    let mut final_url = follow.final_url.clone();
    let mut final_status_code = follow.final_status;

    if let Some(report) = observer {
        for candidate in order_observer_steps(&report.steps) {
            push_candidate(&mut steps, observer_from, candidate);
        }
        if !report.final_location.is_empty() {
            final_url = report.final_location.clone();
        }
        if steps.len() > observer_from {
            if let Some(status) = report.final_status {
                final_status_code = status;
            }
        }
    }

    let tail = steps
        .last()
        .map_or_else(|| original_url.clone(), |s| s.target_url.clone());
    if !same_url(&tail, &final_url) {
        let mechanism = if differs_only_by_fragment(&tail, &final_url) {
            Mechanism::HashChange
        } else {
            Mechanism::ScriptNavigation
        };
        debug!("Reconciling chain tail {} with final location {}", tail, final_url);
        steps.push(RedirectStep::new(
            tail,
            final_url.clone(),
            mechanism,
            FINAL_LOCATION_METHOD,
        ));
    }

    relink(&original_url, &mut steps, observer_from);
    for (index, step) in steps.iter_mut().enumerate() {
        step.sequence_index = index;
    }

    if follow.error.is_some() {
        final_status_code = 0;
    }

    let flags = ChainFlags::from_steps(&original_url, &steps);
    MergedChain {
        has_loop: follow.loop_detected() || has_repeated_url(&original_url, &steps),
        has_mixed_mechanisms: has_mixed_mechanisms(&steps),
        domain_changed: flags.domain_changed(),
        protocol_upgraded: flags.protocol_upgraded(),
        original_url,
        steps,
        final_url,
        final_status_code,
        error: follow.error.clone(),
    }
}

//! Processing statistics tracking.
//!
//! This module provides thread-safe counters for errors, warnings, and
//! informational metrics across a batch of analyses.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{ErrorType, InfoType, WarningType};
use crate::models::{Mechanism, RedirectChainResult};

/// Thread-safe processing statistics tracker.
///
/// Every counter is created up front, so incrementing never allocates and never
/// needs a lock. The struct can be shared across tasks using `Arc`.
pub struct ProcessingStats {
    errors: HashMap<ErrorType, AtomicUsize>,
    warnings: HashMap<WarningType, AtomicUsize>,
    info: HashMap<InfoType, AtomicUsize>,
}

fn counters<T: IntoEnumIterator + Eq + Hash>() -> HashMap<T, AtomicUsize> {
    T::iter().map(|key| (key, AtomicUsize::new(0))).collect()
}

fn bump<T: Eq + Hash + std::fmt::Debug>(map: &HashMap<T, AtomicUsize>, key: T) {
    match map.get(&key) {
        Some(counter) => {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        None => log::error!("No counter registered for {:?}", key),
    }
}

fn read<T: Eq + Hash>(map: &HashMap<T, AtomicUsize>, key: T) -> usize {
    map.get(&key).map(|c| c.load(Ordering::SeqCst)).unwrap_or(0)
}

impl ProcessingStats {
    pub fn new() -> Self {
        ProcessingStats {
            errors: counters(),
            warnings: counters(),
            info: counters(),
        }
    }

    pub fn increment_error(&self, error: ErrorType) {
        bump(&self.errors, error);
    }

    pub fn increment_warning(&self, warning: WarningType) {
        bump(&self.warnings, warning);
    }

    pub fn increment_info(&self, info_type: InfoType) {
        bump(&self.info, info_type);
    }

    pub fn get_error_count(&self, error: ErrorType) -> usize {
        read(&self.errors, error)
    }

    pub fn get_warning_count(&self, warning: WarningType) -> usize {
        read(&self.warnings, warning)
    }

    pub fn get_info_count(&self, info_type: InfoType) -> usize {
        read(&self.info, info_type)
    }

    /// Get total error count across all error types.
    pub fn total_errors(&self) -> usize {
        ErrorType::iter().map(|e| self.get_error_count(e)).sum()
    }

    /// Get total warning count across all warning types.
    pub fn total_warnings(&self) -> usize {
        WarningType::iter().map(|w| self.get_warning_count(w)).sum()
    }

    /// Get total info count across all info types.
    pub fn total_info(&self) -> usize {
        InfoType::iter().map(|i| self.get_info_count(i)).sum()
    }

    /// Records the info metrics implied by a finished chain.
    ///
    /// Errors and warnings are recorded separately by the caller, which knows
    /// their typed cause; the result itself only carries the message.
    pub fn record_chain(&self, result: &RedirectChainResult) {
        if result.blocked.is_some() {
            self.increment_info(InfoType::BlockedByPolicy);
            return;
        }
        let has = |mechanism: Mechanism| result.steps.iter().any(|s| s.mechanism == mechanism);
        if has(Mechanism::Http) {
            self.increment_info(InfoType::HttpRedirect);
        }
        if has(Mechanism::DeclarativeRefresh) {
            self.increment_info(InfoType::DeclarativeRefresh);
        }
        if has(Mechanism::ScriptNavigation) {
            self.increment_info(InfoType::ScriptNavigation);
        }
        if result.steps.len() > 1 {
            self.increment_info(InfoType::MultipleRedirects);
        }
        if result.protocol_upgraded {
            self.increment_info(InfoType::HttpsRedirect);
        }
        if result.has_mixed_mechanisms {
            self.increment_info(InfoType::MixedMechanisms);
        }
        if result.has_loop {
            self.increment_info(InfoType::RedirectLoop);
        }
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

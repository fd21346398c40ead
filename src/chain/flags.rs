//! Domain and protocol change tracking.

use crate::models::RedirectStep;
use crate::normalize::{host_of, scheme_of};

/// Domain/protocol flags tracked against the first URL of a chain.
///
/// `domain_changed` is sticky: once any target lands on another host it stays
/// set, even if the chain later returns to the original host.
/// `protocol_upgraded` compares the original scheme to the latest target only.
#[derive(Debug, Clone)]
pub struct ChainFlags {
    original_host: Option<String>,
    original_scheme: Option<String>,
    latest_scheme: Option<String>,
    domain_changed: bool,
}

impl ChainFlags {
    pub fn new(original_url: &str) -> Self {
        let original_scheme = scheme_of(original_url);
        Self {
            original_host: host_of(original_url),
            latest_scheme: original_scheme.clone(),
            original_scheme,
            domain_changed: false,
        }
    }

    /// Builds flags for a whole step list at once.
    pub fn from_steps(original_url: &str, steps: &[RedirectStep]) -> Self {
        let mut flags = Self::new(original_url);
        for step in steps {
            flags.observe(&step.target_url);
        }
        flags
    }

    /// Records the next URL the chain moved to.
    pub fn observe(&mut self, target_url: &str) {
        let host = host_of(target_url);
        if host.is_some() && host != self.original_host {
            self.domain_changed = true;
        }
        if let Some(scheme) = scheme_of(target_url) {
            self.latest_scheme = Some(scheme);
        }
    }

    pub fn domain_changed(&self) -> bool {
        self.domain_changed
    }

    pub fn protocol_upgraded(&self) -> bool {
        self.original_scheme.as_deref() == Some("http")
            && self.latest_scheme.as_deref() == Some("https")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mechanism;

    #[test]
    fn test_cross_host_target_sets_domain_changed() {
        let mut flags = ChainFlags::new("http://a.test/");
        flags.observe("http://a.test/next");
        assert!(!flags.domain_changed());
        flags.observe("http://b.test/");
        assert!(flags.domain_changed());
        flags.observe("http://a.test/back");
        assert!(flags.domain_changed());
    }

    #[test]
    fn test_host_comparison_ignores_case() {
        let mut flags = ChainFlags::new("http://A.test/");
        flags.observe("http://a.TEST/x");
        assert!(!flags.domain_changed());
    }

    #[test]
    fn test_protocol_upgrade_uses_latest_target() {
        let mut flags = ChainFlags::new("http://a.test/");
        flags.observe("https://a.test/");
        assert!(flags.protocol_upgraded());
        flags.observe("http://a.test/plain");
        assert!(!flags.protocol_upgraded());
    }

    #[test]
    fn test_https_origin_is_never_upgraded() {
        let flags = ChainFlags::from_steps(
            "https://a.test/",
            &[RedirectStep::new(
                "https://a.test/",
                "https://b.test/",
                Mechanism::Http,
                "http_location",
            )],
        );
        assert!(!flags.protocol_upgraded());
        assert!(flags.domain_changed());
    }

    #[test]
    fn test_unparseable_targets_are_ignored() {
        let mut flags = ChainFlags::new("http://a.test/");
        flags.observe("not a url");
        assert!(!flags.domain_changed());
        assert!(!flags.protocol_upgraded());
    }
}

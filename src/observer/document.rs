//! Navigation-relevant facts extracted from a loaded document.
//!
//! Page scripts are never executed. Inline scripts are scanned for the handful of
//! navigation APIs the observer intercepts, and for refresh directives they would
//! inject into the document after load.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::refresh::{extract_refresh_directive, parse_refresh_content, ParsedRefresh};
use crate::config::MAX_SCRIPTS_SCANNED;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("Failed to parse title selector - this is a bug")
});

static INLINE_SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script:not([src])").expect("Failed to parse script selector - this is a bug")
});

// location = "..." / location.href = "..." (optionally prefixed by window., document., self., top.)
static LOCATION_SETTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\b(?:window|document|self|top)\.)?\blocation(?:\.href)?\s*=\s*["']([^"']+)["']"#)
        .expect("Invalid location setter regex")
});

static LOCATION_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\blocation\.(assign|replace)\s*\(\s*["']([^"']+)["']"#)
        .expect("Invalid location method regex")
});

static LOCATION_HASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\blocation\.hash\s*=\s*["']([^"']*)["']"#).expect("Invalid location hash regex")
});

static HISTORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bhistory\.(pushState|replaceState)\s*\([^,]*,[^,]*,\s*["']([^"']+)["']"#)
        .expect("Invalid history regex")
});

// A quoted refresh value inside a script that also mentions http-equiv refresh
static INJECTED_REFRESH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](\d+\s*[;,]\s*(?i:url)\s*=\s*[^"']+)["']"#)
        .expect("Invalid injected refresh regex")
});

/// Which navigation API a script calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationApi {
    /// `location = ...` or `location.href = ...`
    LocationSetter,
    LocationAssign,
    LocationReplace,
    /// `location.hash = ...`
    HashSetter,
    PushState,
    ReplaceState,
}

impl NavigationApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationApi::LocationSetter => "location.href",
            NavigationApi::LocationAssign => "location.assign",
            NavigationApi::LocationReplace => "location.replace",
            NavigationApi::HashSetter => "location.hash",
            NavigationApi::PushState => "history.pushState",
            NavigationApi::ReplaceState => "history.replaceState",
        }
    }

    /// Whether the call unloads the current document.
    pub fn unloads_document(&self) -> bool {
        matches!(
            self,
            NavigationApi::LocationSetter
                | NavigationApi::LocationAssign
                | NavigationApi::LocationReplace
        )
    }

    pub fn is_history(&self) -> bool {
        matches!(self, NavigationApi::PushState | NavigationApi::ReplaceState)
    }
}

/// One navigation call found in an inline script, target already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNavigation {
    pub api: NavigationApi,
    pub target_url: String,
}

/// The parts of a loaded document the page environment and observer act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    pub title: Option<String>,
    /// Refresh directive present in the markup at load
    pub refresh: Option<ParsedRefresh>,
    /// Navigation calls in document order
    pub script_navigations: Vec<ScriptNavigation>,
    /// Refresh directives that scripts add to the document after load
    pub injected_refreshes: Vec<ParsedRefresh>,
}

fn resolve(base: &Url, target: &str) -> Option<String> {
    let joined = base.join(target.trim()).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

fn hash_target(base: &Url, fragment: &str) -> String {
    let mut target = base.clone();
    let fragment = fragment.trim_start_matches('#');
    target.set_fragment(Some(fragment));
    target.to_string()
}

/// Finds navigation calls in one script body, ordered by position.
fn scan_script(script: &str, base: &Url) -> Vec<ScriptNavigation> {
    let mut found: Vec<(usize, ScriptNavigation)> = Vec::new();

    for caps in LOCATION_SETTER_RE.captures_iter(script) {
        if let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) {
            if let Some(target_url) = resolve(base, target.as_str()) {
                found.push((
                    whole.start(),
                    ScriptNavigation {
                        api: NavigationApi::LocationSetter,
                        target_url,
                    },
                ));
            }
        }
    }
    for caps in LOCATION_METHOD_RE.captures_iter(script) {
        if let (Some(whole), Some(method), Some(target)) = (caps.get(0), caps.get(1), caps.get(2)) {
            let api = if method.as_str() == "assign" {
                NavigationApi::LocationAssign
            } else {
                NavigationApi::LocationReplace
            };
            if let Some(target_url) = resolve(base, target.as_str()) {
                found.push((whole.start(), ScriptNavigation { api, target_url }));
            }
        }
    }
    for caps in LOCATION_HASH_RE.captures_iter(script) {
        if let (Some(whole), Some(fragment)) = (caps.get(0), caps.get(1)) {
            found.push((
                whole.start(),
                ScriptNavigation {
                    api: NavigationApi::HashSetter,
                    target_url: hash_target(base, fragment.as_str()),
                },
            ));
        }
    }
    for caps in HISTORY_RE.captures_iter(script) {
        if let (Some(whole), Some(method), Some(target)) = (caps.get(0), caps.get(1), caps.get(2)) {
            let api = if method.as_str() == "pushState" {
                NavigationApi::PushState
            } else {
                NavigationApi::ReplaceState
            };
            if let Some(target_url) = resolve(base, target.as_str()) {
                found.push((whole.start(), ScriptNavigation { api, target_url }));
            }
        }
    }

    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, nav)| nav).collect()
}

fn scan_injected_refreshes(script: &str, base: &Url) -> Vec<ParsedRefresh> {
    let lower = script.to_ascii_lowercase();
    if !(lower.contains("http-equiv") || lower.contains("httpequiv")) || !lower.contains("refresh") {
        return Vec::new();
    }
    INJECTED_REFRESH_RE
        .captures_iter(script)
        .filter_map(|caps| caps.get(1))
        .filter_map(|content| parse_refresh_content(content.as_str(), base))
        .collect()
}

impl PageDocument {
    /// Parses HTML loaded from `base`.
    pub fn parse(html: &str, base: &Url) -> Self {
        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty());

        let refresh = extract_refresh_directive(&document, base);

        let mut script_navigations = Vec::new();
        let mut injected_refreshes = Vec::new();
        for script in document.select(&INLINE_SCRIPT_SELECTOR).take(MAX_SCRIPTS_SCANNED) {
            let body: String = script.text().collect();
            script_navigations.extend(scan_script(&body, base));
            injected_refreshes.extend(scan_injected_refreshes(&body, base));
        }

        PageDocument {
            title,
            refresh,
            script_navigations,
            injected_refreshes,
        }
    }

    /// The refresh directive that applies, markup first.
    pub fn effective_refresh(&self) -> Option<&ParsedRefresh> {
        self.refresh.as_ref().or(self.injected_refreshes.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://c.test/start").expect("base url")
    }

    #[test]
    fn test_title_and_markup_refresh() {
        let doc = PageDocument::parse(
            r#"<html><head><title> Redirecting… </title>
               <meta http-equiv="refresh" content="0;url=http://d.test/"></head></html>"#,
            &base(),
        );
        assert_eq!(doc.title.as_deref(), Some("Redirecting…"));
        assert_eq!(
            doc.refresh,
            Some(ParsedRefresh {
                delay_seconds: 0,
                target_url: "http://d.test/".to_string()
            })
        );
        assert!(doc.script_navigations.is_empty());
    }

    #[test]
    fn test_script_navigations_in_document_order() {
        let doc = PageDocument::parse(
            r#"<script>
                 history.pushState({}, "", "/step");
                 location.hash = "top";
                 window.location.replace('/final');
               </script>"#,
            &base(),
        );
        let apis: Vec<NavigationApi> = doc.script_navigations.iter().map(|n| n.api).collect();
        assert_eq!(
            apis,
            vec![
                NavigationApi::PushState,
                NavigationApi::HashSetter,
                NavigationApi::LocationReplace
            ]
        );
        assert_eq!(doc.script_navigations[0].target_url, "http://c.test/step");
        assert_eq!(doc.script_navigations[1].target_url, "http://c.test/start#top");
        assert_eq!(doc.script_navigations[2].target_url, "http://c.test/final");
    }

    #[test]
    fn test_location_setter_variants() {
        for script in [
            r#"window.location = "http://e.test/";"#,
            r#"location.href='http://e.test/'"#,
            r#"document.location.href = "http://e.test/""#,
        ] {
            let doc = PageDocument::parse(&format!("<script>{script}</script>"), &base());
            assert_eq!(doc.script_navigations.len(), 1, "{script}");
            assert_eq!(doc.script_navigations[0].api, NavigationApi::LocationSetter);
            assert_eq!(doc.script_navigations[0].target_url, "http://e.test/");
        }
    }

    #[test]
    fn test_comparisons_and_external_scripts_are_ignored() {
        let doc = PageDocument::parse(
            r#"<script>if (location.href == "http://e.test/") { go(); }</script>
               <script src="/app.js">location.href = "http://e.test/"</script>"#,
            &base(),
        );
        assert!(doc.script_navigations.is_empty());
    }

    #[test]
    fn test_injected_refresh_detected() {
        let doc = PageDocument::parse(
            r#"<script>
                 var m = document.createElement('meta');
                 m.httpEquiv = 'refresh';
                 m.content = '2;url=/later';
                 document.head.appendChild(m);
               </script>"#,
            &base(),
        );
        assert!(doc.refresh.is_none());
        assert_eq!(doc.injected_refreshes.len(), 1);
        assert_eq!(
            doc.effective_refresh().map(|r| r.target_url.as_str()),
            Some("http://c.test/later")
        );
    }

    #[test]
    fn test_api_properties() {
        assert!(NavigationApi::LocationAssign.unloads_document());
        assert!(!NavigationApi::HashSetter.unloads_document());
        assert!(NavigationApi::ReplaceState.is_history());
        assert_eq!(NavigationApi::PushState.as_str(), "history.pushState");
    }
}

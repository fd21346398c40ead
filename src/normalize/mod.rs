//! URL cleaning and comparison utilities.
//!
//! Every other component goes through this module before it compares, stores, or
//! requests a URL:
//! - `clean_url()` - Strips scheme+host prefixes left by faulty concatenation
//! - `comparison_key()` - Canonical form used for loop detection and dedup
//! - `validate_and_normalize_input()` - Hygiene for operator-supplied input lines

use log::warn;
use url::Url;

use crate::error_handling::AnalysisError;

const SCHEME_MARKERS: [&str; 2] = ["http://", "https://"];

/// Removes scheme+host prefixes that were repeated by faulty upstream concatenation.
///
/// The repeated unit is everything before the second occurrence of a scheme marker,
/// e.g. `https://www.` in `https://www.https://www.example.com/`. Only contiguous
/// repeats at the very start of the string are collapsed.
fn collapse_repeated_prefix(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    if !SCHEME_MARKERS.iter().any(|m| lower.starts_with(m)) {
        return None;
    }

    let mut search_from = 1;
    while let Some(offset) = SCHEME_MARKERS
        .iter()
        .filter_map(|m| lower[search_from..].find(m))
        .min()
    {
        let unit_len = search_from + offset;
        let unit = &lower[..unit_len];
        let mut repeats = 1;
        while lower[unit_len * repeats..].starts_with(unit) {
            repeats += 1;
        }
        if repeats >= 2 {
            return Some(format!("{}{}", &raw[..unit_len], &raw[unit_len * repeats..]));
        }
        search_from = unit_len + 1;
        if search_from >= lower.len() {
            break;
        }
    }
    None
}

/// Drops a leading `scheme://` plus host fragment that runs straight into another
/// scheme marker, keeping the text from the last such marker.
///
/// Covers `https://www.https://amzn.to/x`, where the fragment `www.` is not a
/// copy of what follows. A `/`, `?`, or `#` before the next marker ends the
/// fragment, so URLs embedded in paths and queries are left alone.
fn strip_fragment_prefix(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let mut start = 0;
    while let Some(marker) = SCHEME_MARKERS.iter().find(|m| lower[start..].starts_with(**m)) {
        let rest = &lower[start + marker.len()..];
        let next = SCHEME_MARKERS
            .iter()
            .filter_map(|m| rest.find(m))
            .min()
            .filter(|&at| {
                rest[..at]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            });
        match next {
            Some(at) => start += marker.len() + at,
            None => break,
        }
    }
    (start > 0).then(|| raw[start..].to_string())
}

fn parse_strict(candidate: &str) -> Option<Url> {
    let parsed = Url::parse(candidate).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed),
        _ => None,
    }
}

/// Cleans a raw URL string.
///
/// Strips faulty scheme+host prefixes, then strictly parses the result. Returns
/// the cleaned string when it parses as an http(s) URL with a host, otherwise the
/// original input unchanged. Never returns an empty string for non-empty input.
///
/// # Examples
///
/// ```
/// use redirect_trace::normalize::clean_url;
///
/// assert_eq!(
///     clean_url("https://www.https://www.example.com/"),
///     "https://www.example.com/"
/// );
/// assert_eq!(clean_url("https://www.https://amzn.to/3xYz"), "https://amzn.to/3xYz");
/// assert_eq!(clean_url("https://example.com/a"), "https://example.com/a");
/// ```
pub fn clean_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = strip_fragment_prefix(trimmed).unwrap_or_else(|| trimmed.to_string());
    let candidate = collapse_repeated_prefix(&stripped).unwrap_or(stripped);
    if parse_strict(&candidate).is_some() {
        candidate
    } else {
        raw.to_string()
    }
}

/// Cleans and parses a URL, failing with `MalformedUrl` when that is impossible.
pub fn parse_cleaned(raw: &str) -> Result<Url, AnalysisError> {
    let cleaned = clean_url(raw);
    parse_strict(&cleaned).ok_or_else(|| AnalysisError::MalformedUrl(raw.to_string()))
}

/// Canonical string used whenever two URLs are compared.
///
/// Lower-cases scheme and host, drops default ports, and turns an empty path into
/// `/`. Strings that do not parse fall back to their trimmed form so comparisons
/// still work for malformed input.
pub fn comparison_key(raw: &str) -> String {
    match parse_strict(&clean_url(raw)) {
        Some(url) => url.to_string(),
        None => raw.trim().to_string(),
    }
}

/// Whether two URLs name the same resource.
pub fn same_url(a: &str, b: &str) -> bool {
    comparison_key(a) == comparison_key(b)
}

/// Whether two URLs differ only in their fragment.
pub fn differs_only_by_fragment(a: &str, b: &str) -> bool {
    match (parse_strict(&clean_url(a)), parse_strict(&clean_url(b))) {
        (Some(mut a), Some(mut b)) => {
            if a.fragment() == b.fragment() {
                return false;
            }
            a.set_fragment(None);
            b.set_fragment(None);
            a == b
        }
        _ => false,
    }
}

/// Lower-cased host of a URL, if it has one.
pub fn host_of(raw: &str) -> Option<String> {
    parse_strict(&clean_url(raw)).and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Scheme of a URL, if it parses.
pub fn scheme_of(raw: &str) -> Option<String> {
    parse_strict(&clean_url(raw)).map(|u| u.scheme().to_string())
}

/// Validates and normalizes one line of operator input.
///
/// Adds an `https://` prefix if no scheme is present, then validates that the URL
/// is syntactically valid and uses an http/https scheme. Logs a warning and returns
/// `None` if the line should be skipped.
pub fn validate_and_normalize_input(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&with_scheme) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some() => Some(with_scheme),
            _ => {
                warn!("Skipping unsupported URL: {trimmed}");
                None
            }
        },
        Err(_) => {
            warn!("Skipping invalid URL: {trimmed}");
            None
        }
    }
}

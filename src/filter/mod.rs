//! Affiliate and shortener short-circuit.
//!
//! URLs owned by known third-party redirectors are not navigated: following them
//! would execute untrusted redirector logic and spend network hops on policy-sensitive
//! intermediaries. The check is a pure lookup against `patterns::PATTERN_FAMILIES`.

mod patterns;

use url::Url;

pub use patterns::{PatternFamily, RedirectorKind, PATTERN_FAMILIES};

use crate::models::BlockedInfo;
use crate::normalize::parse_cleaned;

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn family_matches(family: &PatternFamily, url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    if !family.hosts.iter().any(|pattern| host_matches(&host, pattern)) {
        return false;
    }
    match family.path_prefix {
        Some(prefix) => url.path().starts_with(prefix),
        None => true,
    }
}

/// Pulls the merchant destination out of a redirector URL, if the family embeds one.
fn suggested_direct_url(family: &PatternFamily, url: &Url) -> Option<String> {
    family.destination_params.iter().find_map(|param| {
        url.query_pairs()
            .find(|(key, _)| key.as_ref() == *param)
            .and_then(|(_, value)| parse_cleaned(&value).ok())
            .map(|direct| direct.to_string())
    })
}

/// Finds the pattern family a URL belongs to, if any.
pub fn matching_family(raw_url: &str) -> Option<&'static PatternFamily> {
    let url = parse_cleaned(raw_url).ok()?;
    PATTERN_FAMILIES.iter().find(|f| family_matches(f, &url))
}

/// Checks a URL against the affiliate/shortener list.
///
/// Returns `Some(BlockedInfo)` when the URL must not be followed directly. The
/// suggested direct URL is filled in only when the redirector carries the
/// destination in its query string.
///
/// # Examples
///
/// ```
/// use redirect_trace::filter::check_blocklist;
///
/// let blocked = check_blocklist("https://bit.ly/abc123").expect("bitly is blocked");
/// assert_eq!(blocked.service, "Bitly");
/// assert!(check_blocklist("https://example.com/").is_none());
/// ```
pub fn check_blocklist(raw_url: &str) -> Option<BlockedInfo> {
    let url = parse_cleaned(raw_url).ok()?;
    let family = PATTERN_FAMILIES.iter().find(|f| family_matches(f, &url))?;
    log::debug!("{} matches blocked family {}", raw_url, family.service);
    Some(BlockedInfo {
        reason: family.kind.reason().to_string(),
        service: family.service.to_string(),
        suggested_direct_url: suggested_direct_url(family, &url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortener_host_is_blocked() {
        let blocked = check_blocklist("https://bit.ly/3xYz").expect("blocked");
        assert_eq!(blocked.service, "Bitly");
        assert!(blocked.reason.contains("shortener"));
        assert_eq!(blocked.suggested_direct_url, None);
    }

    #[test]
    fn test_listed_host_behind_faulty_prefix_is_blocked() {
        let blocked = check_blocklist("https://www.https://amzn.to/3xYz").expect("blocked");
        assert_eq!(blocked.service, "Amazon Associates");
    }

    #[test]
    fn test_subdomain_of_listed_host_is_blocked() {
        let blocked = check_blocklist("https://shop.sjv.io/c/1/2/3?u=https%3A%2F%2Fmerchant.test%2Fitem")
            .expect("blocked");
        assert_eq!(blocked.service, "Impact");
        assert_eq!(
            blocked.suggested_direct_url.as_deref(),
            Some("https://merchant.test/item")
        );
    }

    #[test]
    fn test_lookalike_host_is_not_blocked() {
        assert!(check_blocklist("https://notbit.ly/abc").is_none());
        assert!(check_blocklist("https://bit.ly.example.com/abc").is_none());
    }

    #[test]
    fn test_path_scoped_family_requires_path() {
        assert!(check_blocklist("https://www.google.com/search?q=rust").is_none());
        let blocked = check_blocklist("https://www.google.com/url?q=https://dest.test/page&sa=D")
            .expect("blocked");
        assert_eq!(blocked.service, "Google redirector");
        assert_eq!(
            blocked.suggested_direct_url.as_deref(),
            Some("https://dest.test/page")
        );
    }

    #[test]
    fn test_affiliate_destination_param_extracted() {
        let blocked = check_blocklist(
            "https://click.linksynergy.com/deeplink?id=abc&mid=1&murl=https%3A%2F%2Fstore.test%2Fp%3Fid%3D9",
        )
        .expect("blocked");
        assert_eq!(blocked.service, "Rakuten Advertising");
        assert_eq!(
            blocked.suggested_direct_url.as_deref(),
            Some("https://store.test/p?id=9")
        );
    }

    #[test]
    fn test_non_url_destination_param_is_ignored() {
        let blocked =
            check_blocklist("https://www.awin1.com/cread.php?awinmid=1&ued=not-a-url").expect("blocked");
        assert_eq!(blocked.service, "Awin");
        assert_eq!(blocked.suggested_direct_url, None);
    }

    #[test]
    fn test_repeated_prefix_is_cleaned_before_lookup() {
        assert!(check_blocklist("https://bit.ly/https://bit.ly/abc").is_some());
    }

    #[test]
    fn test_unparseable_url_is_not_blocked() {
        assert!(check_blocklist("not a url").is_none());
        assert!(matching_family("not a url").is_none());
    }

    #[test]
    fn test_every_family_has_hosts() {
        for family in PATTERN_FAMILIES {
            assert!(!family.hosts.is_empty(), "{} has no hosts", family.service);
        }
    }
}

//! Page refresh directive parsing.
//!
//! Accepts the forms found in the wild: `5;url=/next`, `0; URL='/next'`,
//! `3, url="next"`, `0;/next` (no `url=` key), and `10` (refresh in place).

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

const META_HTTP_EQUIV_SELECTOR_STR: &str = "meta[http-equiv]";

static META_HTTP_EQUIV_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(META_HTTP_EQUIV_SELECTOR_STR)
        .expect("Failed to parse meta http-equiv selector - this is a bug")
});

/// A refresh directive with its target resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRefresh {
    pub delay_seconds: u64,
    pub target_url: String,
}

/// Leading integer of the delay part. `2.5` counts as 2, as browsers do.
fn parse_delay(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn strip_url_key(rest: &str) -> &str {
    let lower = rest.to_ascii_lowercase();
    if let Some(after) = lower.strip_prefix("url") {
        let after_trimmed = after.trim_start();
        if after_trimmed.starts_with('=') {
            let consumed = rest.len() - after_trimmed.len() + 1;
            return rest[consumed..].trim_start();
        }
    }
    rest
}

fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed.strip_prefix(quote) {
            return inner.strip_suffix(quote).unwrap_or(inner).trim();
        }
    }
    trimmed
}

/// Parses a refresh directive value (`"<delay>;url=<target>"`).
///
/// Returns `None` when the delay is missing or not a number, or when the target
/// does not resolve to an http(s) URL. A missing target means the page refreshes
/// itself, so the base URL is returned as the target.
pub fn parse_refresh_content(content: &str, base: &Url) -> Option<ParsedRefresh> {
    let content = content.trim();
    let (delay_part, rest) = match content.find(&[';', ','][..]) {
        Some(idx) => (&content[..idx], &content[idx + 1..]),
        None => (content, ""),
    };
    let delay_seconds = parse_delay(delay_part)?;

    let target = strip_quotes(strip_url_key(rest.trim()));
    let resolved = if target.is_empty() {
        base.clone()
    } else {
        base.join(target).ok()?
    };
    match resolved.scheme() {
        "http" | "https" => Some(ParsedRefresh {
            delay_seconds,
            target_url: resolved.to_string(),
        }),
        _ => None,
    }
}

/// Finds the first usable refresh directive in a parsed document.
///
/// The `http-equiv` value is matched case-insensitively.
pub fn extract_refresh_directive(document: &Html, base: &Url) -> Option<ParsedRefresh> {
    document
        .select(&META_HTTP_EQUIV_SELECTOR)
        .filter(|element| {
            element
                .value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|element| element.value().attr("content"))
        .find_map(|content| parse_refresh_content(content, base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://c.test/dir/page.html").expect("base url")
    }

    fn parse(content: &str) -> Option<ParsedRefresh> {
        parse_refresh_content(content, &base())
    }

    #[test]
    fn test_canonical_form() {
        let parsed = parse("0;url=http://d.test/").expect("parsed");
        assert_eq!(parsed.delay_seconds, 0);
        assert_eq!(parsed.target_url, "http://d.test/");
    }

    #[test]
    fn test_whitespace_case_and_quotes() {
        for content in [
            "5; URL=http://d.test/",
            "5 ;  url = 'http://d.test/'",
            "  5;Url=\"http://d.test/\"  ",
            "5, url=http://d.test/",
        ] {
            let parsed = parse(content).unwrap_or_else(|| panic!("failed on {content}"));
            assert_eq!(parsed.delay_seconds, 5, "{content}");
            assert_eq!(parsed.target_url, "http://d.test/", "{content}");
        }
    }

    #[test]
    fn test_missing_url_key() {
        let parsed = parse("2;http://d.test/next").expect("parsed");
        assert_eq!(parsed.target_url, "http://d.test/next");
    }

    #[test]
    fn test_relative_target_resolves_against_page() {
        assert_eq!(
            parse("1;url=other.html").expect("parsed").target_url,
            "http://c.test/dir/other.html"
        );
        assert_eq!(
            parse("1;url=/root").expect("parsed").target_url,
            "http://c.test/root"
        );
    }

    #[test]
    fn test_delay_only_refreshes_in_place() {
        let parsed = parse("30").expect("parsed");
        assert_eq!(parsed.delay_seconds, 30);
        assert_eq!(parsed.target_url, base().to_string());
    }

    #[test]
    fn test_fractional_delay_truncates() {
        assert_eq!(parse("2.5;url=/x").expect("parsed").delay_seconds, 2);
    }

    #[test]
    fn test_invalid_directives() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("soon;url=/x"), None);
        assert_eq!(parse("0;url=javascript:alert(1)"), None);
    }

    #[test]
    fn test_extract_from_document_ignores_case() {
        let html = Html::parse_document(
            r#"<html><head>
                <meta http-equiv="Content-Type" content="text/html">
                <meta HTTP-EQUIV="Refresh" content="0;url=http://d.test/">
            </head></html>"#,
        );
        let parsed = extract_refresh_directive(&html, &base()).expect("directive");
        assert_eq!(parsed.target_url, "http://d.test/");
    }

    #[test]
    fn test_extract_skips_unusable_directives() {
        let html = Html::parse_document(
            r#"<meta http-equiv="refresh" content="never">
               <meta http-equiv="refresh" content="3;url=/later">"#,
        );
        let parsed = extract_refresh_directive(&html, &base()).expect("directive");
        assert_eq!(parsed.delay_seconds, 3);
        assert_eq!(parsed.target_url, "http://c.test/later");
        assert!(extract_refresh_directive(&Html::parse_document("<p>hi</p>"), &base()).is_none());
    }
}

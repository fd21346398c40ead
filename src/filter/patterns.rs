//! Curated affiliate-network and URL-shortener pattern families.
//!
//! Each family lists the hosts it owns (matched exactly or as a parent domain),
//! an optional path prefix for hosts that only redirect under one path, and the
//! query parameters that carry the merchant destination when the family embeds it.

/// One family of known third-party redirectors.
#[derive(Debug, Clone, Copy)]
pub struct PatternFamily {
    pub service: &'static str,
    pub kind: RedirectorKind,
    pub hosts: &'static [&'static str],
    pub path_prefix: Option<&'static str>,
    pub destination_params: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectorKind {
    AffiliateNetwork,
    UrlShortener,
    TrackingRedirector,
}

impl RedirectorKind {
    pub fn reason(&self) -> &'static str {
        match self {
            RedirectorKind::AffiliateNetwork => {
                "Known affiliate network redirector; not followed directly"
            }
            RedirectorKind::UrlShortener => "Known URL shortener; not followed directly",
            RedirectorKind::TrackingRedirector => {
                "Known click-tracking redirector; not followed directly"
            }
        }
    }
}

pub const PATTERN_FAMILIES: &[PatternFamily] = &[
    PatternFamily {
        service: "Amazon Associates",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["amzn.to", "amzn.eu", "amzn.asia", "a.co"],
        path_prefix: None,
        destination_params: &[],
    },
    PatternFamily {
        service: "Bitly",
        kind: RedirectorKind::UrlShortener,
        hosts: &["bit.ly", "bitly.com", "j.mp"],
        path_prefix: None,
        destination_params: &[],
    },
    PatternFamily {
        service: "TinyURL",
        kind: RedirectorKind::UrlShortener,
        hosts: &["tinyurl.com"],
        path_prefix: None,
        destination_params: &[],
    },
    PatternFamily {
        service: "Generic shortener",
        kind: RedirectorKind::UrlShortener,
        hosts: &["t.co", "ow.ly", "is.gd", "buff.ly", "rebrand.ly", "cutt.ly", "shorturl.at"],
        path_prefix: None,
        destination_params: &[],
    },
    PatternFamily {
        service: "Google redirector",
        kind: RedirectorKind::TrackingRedirector,
        hosts: &["google.com"],
        path_prefix: Some("/url"),
        destination_params: &["q", "url"],
    },
    PatternFamily {
        service: "CJ Affiliate",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &[
            "anrdoezrs.net",
            "dpbolvw.net",
            "jdoqocy.com",
            "kqzyfj.com",
            "tkqlhce.com",
            "emjcd.com",
        ],
        path_prefix: None,
        destination_params: &["url"],
    },
    PatternFamily {
        service: "Rakuten Advertising",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["click.linksynergy.com"],
        path_prefix: None,
        destination_params: &["murl", "RD_PARM1"],
    },
    PatternFamily {
        service: "ShareASale",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["shareasale.com"],
        path_prefix: Some("/r.cfm"),
        destination_params: &["urllink"],
    },
    PatternFamily {
        service: "Awin",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["awin1.com"],
        path_prefix: None,
        destination_params: &["ued", "p"],
    },
    PatternFamily {
        service: "Impact",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["sjv.io", "pxf.io", "ojrq.net", "impact.com"],
        path_prefix: None,
        destination_params: &["u"],
    },
    PatternFamily {
        service: "ClickBank",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["hop.clickbank.net"],
        path_prefix: None,
        destination_params: &[],
    },
    PatternFamily {
        service: "Skimlinks",
        kind: RedirectorKind::AffiliateNetwork,
        hosts: &["go.skimresources.com", "go.redirectingat.com"],
        path_prefix: None,
        destination_params: &["url"],
    },
];

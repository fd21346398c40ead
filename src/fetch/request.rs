//! HTTP request building.
//!
//! This module provides the browser-like headers sent with every hop and the
//! single-request primitive the follower and page loader share.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error_handling::{categorize_reqwest_error, AnalysisError};

/// Browser request headers sent with every hop.
///
/// Redirectors frequently serve different responses (or block) based on request
/// headers, so requests look like a top-level browser navigation. No
/// `Accept-Encoding` is sent: page bodies are scanned as text.
pub(crate) struct RequestHeaders;

impl RequestHeaders {
    /// Applies the standard request headers to a `reqwest::RequestBuilder`.
    pub(crate) fn apply_to_request_builder(
        builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        builder
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(
                reqwest::header::HeaderName::from_static("sec-fetch-dest"),
                "document",
            )
            .header(
                reqwest::header::HeaderName::from_static("sec-fetch-mode"),
                "navigate",
            )
            .header(
                reqwest::header::HeaderName::from_static("sec-fetch-site"),
                "none",
            )
            .header(reqwest::header::UPGRADE_INSECURE_REQUESTS, "1")
    }
}

/// Which request method a hop used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopMethod {
    /// Lightweight probe, no body
    Head,
    /// Full-fidelity fallback
    Get,
}

/// The parts of a response the follower cares about.
#[derive(Debug, Clone)]
pub struct HopResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub method: HopMethod,
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    method: HopMethod,
    timeout: Duration,
) -> Result<HopResponse, AnalysisError> {
    let builder = match method {
        HopMethod::Head => client.head(url),
        HopMethod::Get => client.get(url),
    };
    let response = RequestHeaders::apply_to_request_builder(builder)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            AnalysisError::network(
                categorize_reqwest_error(&e),
                format!("{:?} {} failed: {}", method, url, e),
            )
        })?;

    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(HopResponse {
        status: response.status(),
        location,
        method,
    })
}

/// Requests one hop: HEAD first, then a single GET fallback.
///
/// The GET is issued when HEAD fails at the transport level or answers with
/// anything other than 2xx/3xx (many servers reject or mishandle HEAD). Whatever
/// the GET returns is final for this hop.
///
/// # Errors
///
/// Returns `AnalysisError::Network` if the GET fallback also fails to produce a response.
pub async fn probe(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<HopResponse, AnalysisError> {
    match send(client, url, HopMethod::Head, timeout).await {
        Ok(response) if response.status.is_success() || response.status.is_redirection() => {
            return Ok(response)
        }
        Ok(response) => {
            log::debug!(
                "HEAD {} returned {}, retrying with GET",
                url,
                response.status
            );
        }
        Err(e) => {
            log::debug!("{}, retrying with GET", e);
        }
    }
    send(client, url, HopMethod::Get, timeout).await
}

//! Page-level detection through the public analyzer API.

use std::time::Duration;

use httptest::{matchers::*, responders::*, Expectation, Server};
use redirect_trace::observer::EnvironmentCapabilities;
use redirect_trace::{AnalysisRequest, AnalysisSettings, Analyzer, DetectionMode, Mechanism};

fn settings() -> AnalysisSettings {
    AnalysisSettings {
        timeout_ms: 4_000,
        max_redirects: 10,
        delay_between_requests_ms: 0,
    }
}

fn analyzer() -> Analyzer {
    Analyzer::new(redirect_trace::config::DEFAULT_USER_AGENT).expect("Failed to build analyzer")
}

fn page_with_head_ok(server: &Server, path: &'static str, html: String) {
    server.expect(
        Expectation::matching(request::method_path("HEAD", path)).respond_with(status_code(200)),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", path))
            .respond_with(status_code(200).body(html)),
    );
}

#[tokio::test]
async fn script_replace_is_script_navigation() {
    let server = Server::run();
    let next = server.url("/next").to_string();
    page_with_head_ok(
        &server,
        "/",
        format!(r#"<html><script>window.location.replace("{}");</script></html>"#, next),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/next"))
            .respond_with(status_code(200).body("<html><title>Next</title></html>")),
    );

    let request = AnalysisRequest::new(server.url("/").to_string(), DetectionMode::Observed, settings());
    let result = analyzer().analyze(&request).await;

    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].mechanism, Mechanism::ScriptNavigation);
    assert_eq!(result.steps[0].detection_method, "property_intercept");
    assert_eq!(result.final_url, next);
    assert!(!result.domain_changed);
}

#[tokio::test]
async fn script_navigation_is_still_seen_without_interceptors() {
    let server = Server::run();
    let next = server.url("/next").to_string();
    page_with_head_ok(
        &server,
        "/",
        format!(r#"<html><script>location.href = "{}";</script></html>"#, next),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/next"))
            .respond_with(status_code(200).body("<html></html>")),
    );

    let analyzer = analyzer()
        .with_capabilities(EnvironmentCapabilities::locked_down())
        .with_reply_timeout(Duration::from_secs(10));
    let request = AnalysisRequest::new(server.url("/").to_string(), DetectionMode::Observed, settings());
    let result = analyzer.analyze(&request).await;

    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].mechanism, Mechanism::ScriptNavigation);
    assert_eq!(result.steps[0].detection_method, "unload_event");
}

#[tokio::test]
async fn delayed_refresh_records_its_delay() {
    let server = Server::run();
    let next = server.url("/later").to_string();
    page_with_head_ok(
        &server,
        "/",
        format!(r#"<meta http-equiv="Refresh" content="1; URL='{}'">"#, next),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/later"))
            .respond_with(status_code(200).body("<html></html>")),
    );

    let request = AnalysisRequest::new(server.url("/").to_string(), DetectionMode::Observed, settings());
    let result = analyzer().analyze(&request).await;

    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].mechanism, Mechanism::DeclarativeRefresh);
    assert_eq!(result.steps[0].delay_seconds, Some(1));
    assert!(result.analysis_duration_ms >= 1_000);
}

#[tokio::test]
async fn refresh_beyond_window_is_not_followed() {
    let server = Server::run();
    page_with_head_ok(
        &server,
        "/",
        r#"<meta http-equiv="refresh" content="600;url=/much-later">"#.to_string(),
    );

    let request = AnalysisRequest::new(server.url("/").to_string(), DetectionMode::Observed, settings());
    let result = analyzer().analyze(&request).await;

    assert!(result.steps.is_empty());
    assert_eq!(result.final_status_code, 200);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn http_then_refresh_then_script_is_mixed() {
    let server = Server::run();
    let landing = server.url("/landing").to_string();
    let hop = server.url("/hop").to_string();
    let end = server.url("/end").to_string();
    server.expect(
        Expectation::matching(request::method_path("HEAD", "/"))
            .respond_with(status_code(301).insert_header("Location", "/landing")),
    );
    page_with_head_ok(
        &server,
        "/landing",
        format!(r#"<meta http-equiv="refresh" content="0;url={}">"#, hop),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/hop")).respond_with(
            status_code(200).body(format!(r#"<script>location.assign("{}")</script>"#, end)),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/end"))
            .respond_with(status_code(200).body("<html></html>")),
    );

    let request = AnalysisRequest::new(server.url("/").to_string(), DetectionMode::Observed, settings());
    let result = analyzer().analyze(&request).await;

    let mechanisms: Vec<Mechanism> = result.steps.iter().map(|s| s.mechanism).collect();
    assert_eq!(
        mechanisms,
        vec![
            Mechanism::Http,
            Mechanism::DeclarativeRefresh,
            Mechanism::ScriptNavigation
        ]
    );
    assert_eq!(result.steps[1].source_url, landing);
    assert_eq!(result.steps[2].source_url, hop);
    assert_eq!(result.final_url, end);
    assert!(result.has_mixed_mechanisms);
    for (index, step) in result.steps.iter().enumerate() {
        assert_eq!(step.sequence_index, index);
    }
}

#[tokio::test]
async fn page_hops_share_the_redirect_cap_with_the_follower() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("HEAD", "/0"))
            .respond_with(status_code(301).insert_header("Location", "/1")),
    );
    server.expect(
        Expectation::matching(request::method_path("HEAD", "/1"))
            .respond_with(status_code(301).insert_header("Location", "/2")),
    );
    page_with_head_ok(
        &server,
        "/2",
        r#"<script>location.href = "/3";</script>"#.to_string(),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/3"))
            .respond_with(status_code(301).insert_header("Location", "/4")),
    );
    // Served once so the environment can see the next hop; it is never followed
    server.expect(
        Expectation::matching(request::method_path("GET", "/4"))
            .respond_with(status_code(301).insert_header("Location", "/5")),
    );

    let settings = AnalysisSettings {
        max_redirects: 3,
        ..settings()
    };
    let request = AnalysisRequest::new(server.url("/0").to_string(), DetectionMode::Observed, settings);
    let result = analyzer().analyze(&request).await;

    let mechanisms: Vec<Mechanism> = result.steps.iter().map(|s| s.mechanism).collect();
    assert_eq!(
        mechanisms,
        vec![
            Mechanism::Http,
            Mechanism::Http,
            Mechanism::ScriptNavigation,
            Mechanism::Http
        ]
    );
    let http_hops = result.steps.iter().filter(|s| s.mechanism == Mechanism::Http).count();
    assert!(http_hops <= 3);
    assert_eq!(result.final_url, server.url("/4").to_string());
    assert!(result.error.is_none());
    assert!(!result.has_loop);
}

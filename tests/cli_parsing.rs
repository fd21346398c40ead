//! Tests for command-line parsing.

use clap::Parser;
use redirect_trace::config::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS};
use redirect_trace::{Config, DetectionMode, LogFormat, LogLevel, SettingsProvider};

#[test]
fn test_defaults() {
    let config = Config::try_parse_from(["redirect_trace", "urls.txt"]).expect("Should parse");
    assert_eq!(config.file.to_str(), Some("urls.txt"));
    assert_eq!(config.mode, DetectionMode::NetworkOnly);
    assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
    assert!(matches!(config.log_level, LogLevel::Info));
    assert!(matches!(config.log_format, LogFormat::Plain));
    assert!(!config.show_stats);
}

#[test]
fn test_all_options() {
    let config = Config::try_parse_from([
        "redirect_trace",
        "-",
        "--mode",
        "observed",
        "--timeout-ms",
        "2500",
        "--max-redirects",
        "3",
        "--delay-ms",
        "0",
        "--user-agent",
        "tester/1.0",
        "--log-level",
        "debug",
        "--log-format",
        "json",
        "--show-stats",
    ])
    .expect("Should parse");

    assert_eq!(config.file.to_str(), Some("-"));
    assert_eq!(config.mode, DetectionMode::Observed);
    assert_eq!(config.user_agent, "tester/1.0");
    assert!(matches!(config.log_level, LogLevel::Debug));
    assert!(matches!(config.log_format, LogFormat::Json));
    assert!(config.show_stats);

    let settings = config.settings();
    assert_eq!(settings.timeout_ms, 2_500);
    assert_eq!(settings.max_redirects, 3);
    assert_eq!(settings.delay_between_requests_ms, 0);
}

#[test]
fn test_missing_file_argument_is_rejected() {
    assert!(Config::try_parse_from(["redirect_trace"]).is_err());
}

#[test]
fn test_unknown_mode_is_rejected() {
    let result = Config::try_parse_from(["redirect_trace", "urls.txt", "--mode", "browser"]);
    assert!(result.is_err());
}

#[test]
fn test_non_numeric_limit_is_rejected() {
    let result =
        Config::try_parse_from(["redirect_trace", "urls.txt", "--max-redirects", "many"]);
    assert!(result.is_err());
}

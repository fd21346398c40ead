//! Sequential batch driver.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::analyzer::{AnalysisReport, Analyzer};
use crate::app::{log_progress, shutdown_gracefully};
use crate::config::{SettingsProvider, LOGGING_INTERVAL};
use crate::error_handling::{InfoType, ProcessingStats};
use crate::fetch::FollowTerminal;
use crate::models::{AnalysisRequest, DetectionMode, RedirectChainResult};
use crate::normalize::validate_and_normalize_input;

/// Summary of a finished (or stopped) batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// URLs analyzed
    pub total_urls: usize,
    /// Results without an error
    pub successful: usize,
    /// Results carrying an error
    pub failed: usize,
    /// URLs left unanalyzed because the batch was stopped
    pub skipped: usize,
    pub cancelled: bool,
}

/// Reads URLs from a buffered reader, one per line.
///
/// Blank lines and `#` comments are skipped; lines that are not usable URLs
/// are logged and skipped.
pub async fn read_urls<R>(reader: R) -> Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut urls = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read line from input")?
    {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(url) = validate_and_normalize_input(trimmed) {
            urls.push(url);
        }
    }
    Ok(urls)
}

/// Reads URLs from a file, or from stdin when `path` is `-`.
pub async fn load_urls(path: &Path) -> Result<Vec<String>> {
    if path.as_os_str() == "-" {
        info!("Reading URLs from stdin");
        return read_urls(BufReader::new(tokio::io::stdin())).await;
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    let urls = read_urls(BufReader::new(file)).await?;
    info!("Total URLs in file: {}", urls.len());
    Ok(urls)
}

/// Records the typed causes behind one result.
fn record_report(stats: &ProcessingStats, report: &AnalysisReport) {
    stats.record_chain(&report.result);
    if report.terminal == Some(FollowTerminal::HopLimitReached) {
        stats.increment_info(InfoType::HopLimitReached);
    }
    for error in report.error.iter().chain(report.observer_error.iter()) {
        if let Some(error_type) = error.error_type() {
            stats.increment_error(error_type);
        }
    }
    for warning in &report.warnings {
        stats.increment_warning(*warning);
    }
}

/// Analyzes `urls` one at a time.
///
/// Settings are taken from `provider` before each analysis. Between slots the
/// driver waits `delayBetweenRequestsMs` and checks `cancel`; an analysis that
/// has started always completes. `on_result` sees every result in input order.
pub async fn run_batch<P, F>(
    analyzer: &Analyzer,
    urls: &[String],
    mode: DetectionMode,
    provider: &P,
    stats: &ProcessingStats,
    cancel: &CancellationToken,
    mut on_result: F,
) -> BatchSummary
where
    P: SettingsProvider,
    F: FnMut(&RedirectChainResult),
{
    let start_time = Instant::now();
    let completed = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let total = urls.len();

    let cancel_logging = CancellationToken::new();
    let logging_task = {
        let cancel_logging = cancel_logging.child_token();
        let completed = Arc::clone(&completed);
        let failed = Arc::clone(&failed);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL as u64));
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => log_progress(start_time, &completed, &failed, Some(total)),
                    _ = cancel_logging.cancelled() => break,
                }
            }
        })
    };

    let mut analyzed = 0usize;
    let mut cancelled = false;
    for (slot, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        let settings = provider.settings();
        if slot > 0 && settings.delay_between_requests_ms > 0 {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(settings.delay_between_requests_ms)) => {}
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        let request = AnalysisRequest::new(url.as_str(), mode, settings);
        let report = analyzer.analyze_with_diagnostics(&request).await;
        record_report(stats, &report);
        if report.result.error.is_some() {
            failed.fetch_add(1, Ordering::SeqCst);
        } else {
            completed.fetch_add(1, Ordering::SeqCst);
        }
        analyzed += 1;
        on_result(&report.result);
    }

    if cancelled {
        warn!("Batch stopped after {} of {} URLs", analyzed, total);
    }
    shutdown_gracefully(cancel_logging, Some(logging_task)).await;
    log_progress(start_time, &completed, &failed, Some(total));

    BatchSummary {
        total_urls: analyzed,
        successful: completed.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
        skipped: total - analyzed,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisSettings;
    use httptest::{matchers::*, responders::*, Expectation, Server};

    fn analyzer() -> Analyzer {
        Analyzer::new(crate::config::DEFAULT_USER_AGENT).expect("client")
    }

    fn no_delay() -> AnalysisSettings {
        AnalysisSettings {
            timeout_ms: 2_000,
            max_redirects: 5,
            delay_between_requests_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_read_urls_skips_blank_and_comments() {
        let input: &[u8] = b"# list\n\nexample.com\n   \nhttp://a.test/x\n";
        let urls = read_urls(BufReader::new(input)).await.expect("read");
        assert_eq!(urls, vec!["https://example.com".to_string(), "http://a.test/x".to_string()]);
    }

    #[tokio::test]
    async fn test_load_urls_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "http://a.test/").expect("write");
        writeln!(file, "# skipped").expect("write");
        let urls = load_urls(file.path()).await.expect("load");
        assert_eq!(urls, vec!["http://a.test/".to_string()]);
    }

    #[tokio::test]
    async fn test_load_urls_missing_file_is_error() {
        let result = load_urls(Path::new("/nonexistent/urls.txt")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_batch_runs_every_url_and_counts() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/ok"))
                .respond_with(status_code(200)),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/gone"))
                .respond_with(status_code(404)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/gone"))
                .respond_with(status_code(404)),
        );
        let urls = vec![server.url("/ok").to_string(), server.url("/gone").to_string()];
        let stats = ProcessingStats::new();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let summary = run_batch(
            &analyzer(),
            &urls,
            DetectionMode::NetworkOnly,
            &no_delay(),
            &stats,
            &cancel,
            |result| seen.push(result.original_url.clone()),
        )
        .await;

        assert_eq!(summary.total_urls, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.cancelled);
        assert_eq!(seen, urls);
        assert_eq!(stats.total_errors(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_remaining_slots() {
        let urls = vec!["http://a.test/".to_string(), "http://b.test/".to_string()];
        let stats = ProcessingStats::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run_batch(
            &analyzer(),
            &urls,
            DetectionMode::NetworkOnly,
            &no_delay(),
            &stats,
            &cancel,
            |_| panic!("no analysis should run"),
        )
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.total_urls, 0);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_stops_before_next_slot() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/one"))
                .times(1)
                .respond_with(status_code(200)),
        );
        let urls = vec![server.url("/one").to_string(), server.url("/two").to_string()];
        let stats = ProcessingStats::new();
        let cancel = CancellationToken::new();
        let settings = AnalysisSettings {
            delay_between_requests_ms: 10_000,
            ..no_delay()
        };

        let trigger = cancel.clone();
        let summary = run_batch(
            &analyzer(),
            &urls,
            DetectionMode::NetworkOnly,
            &settings,
            &stats,
            &cancel,
            move |_| trigger.cancel(),
        )
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.total_urls, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_blocked_url_counts_as_success() {
        let urls = vec!["https://bit.ly/abc".to_string()];
        let stats = ProcessingStats::new();
        let summary = run_batch(
            &analyzer(),
            &urls,
            DetectionMode::NetworkOnly,
            &no_delay(),
            &stats,
            &CancellationToken::new(),
            |result| assert!(result.blocked.is_some()),
        )
        .await;
        assert_eq!(summary.successful, 1);
        assert_eq!(stats.get_info_count(InfoType::BlockedByPolicy), 1);
    }
}

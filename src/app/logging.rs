//! Progress logging utilities.

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Logs progress information about a batch.
///
/// # Arguments
///
/// * `start_time` - The start time of the batch
/// * `completed_urls` - URLs analyzed without an error
/// * `failed_urls` - URLs whose result carries an error
/// * `total_urls` - URLs in the batch, when known
pub fn log_progress(
    start_time: std::time::Instant,
    completed_urls: &Arc<AtomicUsize>,
    failed_urls: &Arc<AtomicUsize>,
    total_urls: Option<usize>,
) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let completed = completed_urls.load(Ordering::SeqCst);
    let failed = failed_urls.load(Ordering::SeqCst);
    let done = completed + failed;
    let rate = if elapsed_secs > 0.0 {
        done as f64 / elapsed_secs
    } else {
        0.0
    };
    match total_urls {
        Some(total) => info!(
            "Analyzed {}/{} URLs ({} failed) in {:.2} seconds (~{:.2} URLs/sec)",
            done, total, failed, elapsed_secs, rate
        ),
        None => info!(
            "Analyzed {} URLs ({} failed) in {:.2} seconds (~{:.2} URLs/sec)",
            done, failed, elapsed_secs, rate
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_handles_zero_elapsed() {
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        log_progress(std::time::Instant::now(), &completed, &failed, Some(0));
        log_progress(std::time::Instant::now(), &completed, &failed, None);
    }
}

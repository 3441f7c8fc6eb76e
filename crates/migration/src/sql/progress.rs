//! Progress reporting for long-running data migrations

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Shared counter of processed items, updated concurrently by workers
#[derive(Debug, Default)]
pub struct Progress {
    done: AtomicU64,
    /// 0 when unknown
    total: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total(total: u64) -> Self {
        Self {
            done: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    pub fn advance(&self, n: u64) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        match self.total.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }
}

/// Logs a [`Progress`] periodically from a background task until stopped
pub struct ProgressLogger {
    label: String,
    plural: String,
    progress: Arc<Progress>,
    started: Instant,
    ticker: JoinHandle<()>,
}

impl ProgressLogger {
    /// Start logging every `period`; must be called within a tokio runtime
    pub fn start(label: &str, plural: &str, progress: Arc<Progress>, period: Duration) -> Self {
        let started = Instant::now();
        let ticker = {
            let label = label.to_string();
            let plural = plural.to_string();
            let progress = Arc::clone(&progress);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(started + period, period);
                loop {
                    interval.tick().await;
                    tracing::info!(
                        migration = %label,
                        "{}",
                        progress_message(&plural, &progress, started.elapsed())
                    );
                }
            })
        };

        Self {
            label: label.to_string(),
            plural: plural.to_string(),
            progress,
            started,
            ticker,
        }
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    /// Stop the ticker and log the final count, which is returned
    pub fn stop(self) -> u64 {
        self.ticker.abort();
        let done = self.progress.done();
        tracing::info!(
            migration = %self.label,
            "{} {} processed in {:.1}s",
            done,
            self.plural,
            self.started.elapsed().as_secs_f64()
        );
        done
    }
}

impl Drop for ProgressLogger {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

fn progress_message(plural: &str, progress: &Progress, elapsed: Duration) -> String {
    let done = progress.done();
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { done as f64 / secs } else { 0.0 };
    let mut message = format!("{} {} processed ({:.0} items/sec)", done, plural, rate);

    if let Some(total) = progress.total() {
        let remaining = total.saturating_sub(done);
        message.push_str(&format!(", {} remaining", remaining));
        if rate > 0.0 {
            message.push_str(&format!(", ETA {:.0}s", remaining as f64 / rate));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_shared() {
        let progress = Arc::new(Progress::with_total(10));
        let other = Arc::clone(&progress);
        progress.advance(3);
        other.advance(2);
        assert_eq!(progress.done(), 5);
        assert_eq!(progress.total(), Some(10));
        assert_eq!(Progress::new().total(), None);
    }

    #[test]
    fn test_message_with_and_without_total() {
        let progress = Progress::new();
        progress.advance(100);
        assert_eq!(
            progress_message("rows", &progress, Duration::from_secs(10)),
            "100 rows processed (10 items/sec)"
        );

        progress.set_total(300);
        assert_eq!(
            progress_message("rows", &progress, Duration::from_secs(10)),
            "100 rows processed (10 items/sec), 200 remaining, ETA 20s"
        );
    }

    #[tokio::test]
    async fn test_stop_returns_count() {
        let progress = Arc::new(Progress::new());
        let logger =
            ProgressLogger::start("test", "rows", Arc::clone(&progress), Duration::from_millis(5));
        progress.advance(7);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(logger.stop(), 7);
    }
}

//! Live counters shared by all pipeline workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::types::HarvestStats;

/// Atomic progress counters.
///
/// Workers only ever increment; readers take a [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct Progress {
    keywords_searched: AtomicU64,
    keywords_abandoned: AtomicU64,
    jobs_produced: AtomicU64,
    records_produced: AtomicU64,
    jobs_failed: AtomicU64,
    rows_written: AtomicU64,
    rows_failed: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn keyword_done(&self, abandoned: bool) {
        self.keywords_searched.fetch_add(1, Ordering::Relaxed);
        if abandoned {
            self.keywords_abandoned.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn job_produced(&self) {
        self.jobs_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_produced(&self) {
        self.records_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn row_written(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn row_failed(&self) {
        self.rows_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters at once.
    pub fn snapshot(&self, elapsed: Duration) -> HarvestStats {
        HarvestStats {
            keywords_searched: self.keywords_searched.load(Ordering::Relaxed),
            keywords_abandoned: self.keywords_abandoned.load(Ordering::Relaxed),
            jobs_produced: self.jobs_produced.load(Ordering::Relaxed),
            records_produced: self.records_produced.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_increments() {
        let progress = Progress::new();
        progress.keyword_done(false);
        progress.keyword_done(true);
        progress.job_produced();
        progress.job_failed();
        progress.row_written();

        let stats = progress.snapshot(Duration::from_secs(1));
        assert_eq!(stats.keywords_searched, 2);
        assert_eq!(stats.keywords_abandoned, 1);
        assert_eq!(stats.jobs_produced, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.rows_failed, 0);
        assert_eq!(stats.elapsed, Duration::from_secs(1));
    }
}

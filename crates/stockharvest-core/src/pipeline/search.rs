//! Search stage: turns keywords into download jobs.
//!
//! Each [`Searcher`] owns one credential for its whole lifetime and pages
//! through the catalog for every keyword it pulls from the shared queue.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::channel::{WorkQueue, WorkSender};
use super::progress::Progress;
use crate::catalog::{epoch_millis, rate_limit_wait, CatalogSearch};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{Credential, DownloadJob};

/// Pagination and retry settings for one searcher.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Results per page; a shorter page is the last one
    pub page_size: u32,
    /// Consecutive non-rate-limit failures before a keyword is abandoned
    pub max_failures: u32,
    /// Sleep between retries of a failed page
    pub failure_backoff: Duration,
    /// Added to the rate-limit reset time
    pub rate_limit_slack: Duration,
    /// Assumed reset horizon when a rate-limit response carries none
    pub rate_limit_fallback: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_failures: config.max_failures,
            failure_backoff: config.failure_backoff(),
            rate_limit_slack: config.rate_limit_slack(),
            rate_limit_fallback: config.rate_limit_fallback(),
        }
    }
}

/// Everything one keyword search produced.
#[derive(Debug, Default)]
pub struct KeywordHarvest {
    /// Jobs collected, including those from before an abandonment
    pub jobs: Vec<DownloadJob>,
    /// Pages fetched successfully
    pub pages: u32,
    /// The failure threshold was hit before the last page
    pub abandoned: bool,
}

/// A search worker bound to one credential.
pub struct Searcher {
    catalog: Arc<dyn CatalogSearch>,
    credential: Credential,
    options: SearchOptions,
    cancel: CancellationToken,
    clock: fn() -> u64,
}

impl Searcher {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        credential: Credential,
        options: SearchOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            credential,
            options,
            cancel,
            clock: epoch_millis,
        }
    }

    /// Replace the wall clock used to interpret rate-limit reset times.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Page through every result for `keyword`.
    ///
    /// Stops on the first page shorter than the page size. Rate-limited pages
    /// are retried after the reset time without counting as failures; other
    /// failures are retried after a fixed backoff until `max_failures`
    /// consecutive ones, at which point the keyword is abandoned and the jobs
    /// gathered so far are returned.
    pub async fn fetch_metadata_by_keyword(&self, keyword: &str) -> KeywordHarvest {
        let mut harvest = KeywordHarvest::default();
        let mut page: u32 = 1;
        let mut failures: u32 = 0;

        while !self.cancel.is_cancelled() {
            let result = self
                .catalog
                .search(keyword, page, self.options.page_size, &self.credential)
                .await;

            match result {
                Ok(results) => {
                    let count = results.items.len();
                    let total = results.total_count;
                    harvest.pages += 1;
                    for item in results.items {
                        let item_id = item.id.clone();
                        match item.into_job(keyword) {
                            Some(job) => harvest.jobs.push(job),
                            None => tracing::warn!(
                                keyword,
                                photo_id = %item_id,
                                "Catalog item has no thumbnail, skipping"
                            ),
                        }
                    }
                    tracing::debug!(keyword, page, count, total, "Fetched search page");

                    if count < self.options.page_size as usize {
                        break;
                    }
                    page += 1;
                    failures = 0;
                }
                Err(SearchError::RateLimited { reset_at_ms }) => {
                    let wait = rate_limit_wait(
                        reset_at_ms,
                        (self.clock)(),
                        self.options.rate_limit_fallback,
                        self.options.rate_limit_slack,
                    );
                    tracing::warn!(
                        keyword,
                        page,
                        credential = %self.credential.identifier,
                        "Rate limited, retrying in {:?}",
                        wait
                    );
                    if !self.sleep(wait).await {
                        break;
                    }
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.options.max_failures {
                        tracing::warn!(
                            keyword,
                            page,
                            collected = harvest.jobs.len(),
                            "Giving up on keyword after {failures} consecutive failures: {e}"
                        );
                        harvest.abandoned = true;
                        break;
                    }
                    tracing::warn!(
                        keyword,
                        page,
                        "Search failed ({failures}/{}), retrying in {:?}: {e}",
                        self.options.max_failures,
                        self.options.failure_backoff
                    );
                    if !self.sleep(self.options.failure_backoff).await {
                        break;
                    }
                }
            }
        }

        harvest
    }

    /// Pull keywords until this worker's shutdown marker, forwarding every
    /// job downstream. Nothing is forwarded on exit: the orchestrator signals
    /// the next stage once all searchers have returned.
    pub async fn run(
        self,
        keywords: WorkQueue<String>,
        jobs: WorkSender<DownloadJob>,
        progress: Arc<Progress>,
    ) {
        tracing::debug!(
            credential = %self.credential.identifier,
            catalog = self.catalog.name(),
            "Search worker started"
        );

        while let Some(keyword) = keywords.next(&self.cancel).await {
            let harvest = self.fetch_metadata_by_keyword(&keyword).await;
            if self.cancel.is_cancelled() {
                tracing::info!(
                    keyword = %keyword,
                    jobs = harvest.jobs.len(),
                    "Keyword search interrupted"
                );
            } else {
                tracing::info!(
                    keyword = %keyword,
                    pages = harvest.pages,
                    jobs = harvest.jobs.len(),
                    abandoned = harvest.abandoned,
                    "Keyword searched"
                );
                progress.keyword_done(harvest.abandoned);
            }

            for job in harvest.jobs {
                if jobs.send(job).is_err() {
                    tracing::error!("Job queue closed, stopping search worker");
                    return;
                }
                progress.job_produced();
            }
        }

        tracing::debug!(credential = %self.credential.identifier, "Search worker exiting");
    }

    /// Sleep unless cancelled first. Returns `false` on cancellation.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::work_queue;
    use crate::pipeline::test_support::{page_of, MockCatalog};

    const NOW_MS: u64 = 1_700_000_000_000;

    fn fixed_clock() -> u64 {
        NOW_MS
    }

    fn searcher(catalog: Arc<MockCatalog>) -> Searcher {
        Searcher::new(
            catalog,
            Credential::new("id", "secret"),
            SearchOptions::default(),
            CancellationToken::new(),
        )
        .with_clock(fixed_clock)
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(25, 0)))
                .respond("cat", Ok(page_of(25, 25)))
                .respond("cat", Ok(page_of(3, 50))),
        );
        let harvest = searcher(catalog.clone())
            .fetch_metadata_by_keyword("cat")
            .await;

        assert_eq!(harvest.jobs.len(), 53);
        assert_eq!(harvest.pages, 3);
        assert!(!harvest.abandoned);
        let pages: Vec<u32> = catalog.calls().iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exactly_full_last_page_needs_one_more_request() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(25, 0)))
                .respond("cat", Ok(page_of(0, 0))),
        );
        let harvest = searcher(catalog.clone())
            .fetch_metadata_by_keyword("cat")
            .await;

        assert_eq!(harvest.jobs.len(), 25);
        assert_eq!(catalog.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_reset_plus_slack_and_retries_same_page() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(25, 0)))
                .respond(
                    "cat",
                    Err(SearchError::RateLimited {
                        reset_at_ms: Some(NOW_MS + 5000),
                    }),
                )
                .respond("cat", Ok(page_of(2, 25))),
        );
        let harvest = searcher(catalog.clone())
            .fetch_metadata_by_keyword("cat")
            .await;

        let calls = catalog.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].page, 2);
        assert_eq!(calls[2].page, 2);
        assert_eq!(calls[2].at - calls[1].at, Duration::from_millis(65_000));
        assert_eq!(harvest.jobs.len(), 27);
        assert!(!harvest.abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limits_do_not_count_as_failures() {
        let mut catalog = MockCatalog::new()
            .respond("cat", Err(SearchError::Api { status: 500, message: "boom".into() }))
            .respond("cat", Err(SearchError::Api { status: 500, message: "boom".into() }));
        for _ in 0..5 {
            catalog = catalog.respond("cat", Err(SearchError::RateLimited { reset_at_ms: None }));
        }
        let catalog = Arc::new(catalog.respond("cat", Ok(page_of(1, 0))));

        let harvest = searcher(catalog.clone())
            .fetch_metadata_by_keyword("cat")
            .await;

        assert!(!harvest.abandoned);
        assert_eq!(harvest.jobs.len(), 1);
        assert_eq!(catalog.calls().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandons_after_three_failures_keeping_partial_results() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(25, 0)))
                .respond("cat", Err(SearchError::Transport("reset".into())))
                .respond("cat", Err(SearchError::Api { status: 503, message: "".into() }))
                .respond("cat", Err(SearchError::Parse("eof".into())))
                .respond("cat", Ok(page_of(25, 25))),
        );
        let harvest = searcher(catalog.clone())
            .fetch_metadata_by_keyword("cat")
            .await;

        assert!(harvest.abandoned);
        assert_eq!(harvest.jobs.len(), 25);
        let calls = catalog.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[1..].iter().all(|c| c.page == 2));
        assert_eq!(calls[2].at - calls[1].at, Duration::from_secs(10));
        assert_eq!(calls[3].at - calls[2].at, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_counter() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Err(SearchError::Transport("x".into())))
                .respond("cat", Err(SearchError::Transport("x".into())))
                .respond("cat", Ok(page_of(25, 0)))
                .respond("cat", Err(SearchError::Transport("x".into())))
                .respond("cat", Err(SearchError::Transport("x".into())))
                .respond("cat", Ok(page_of(4, 25))),
        );
        let harvest = searcher(catalog).fetch_metadata_by_keyword("cat").await;

        assert!(!harvest.abandoned);
        assert_eq!(harvest.jobs.len(), 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_rate_limit_sleep() {
        let catalog = Arc::new(
            MockCatalog::new().respond("cat", Err(SearchError::RateLimited { reset_at_ms: None })),
        );
        let cancel = CancellationToken::new();
        let searcher = Searcher::new(
            catalog.clone(),
            Credential::new("id", "secret"),
            SearchOptions::default(),
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { searcher.fetch_metadata_by_keyword("cat").await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let harvest = handle.await.unwrap();
        assert!(harvest.jobs.is_empty());
        assert_eq!(catalog.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_keyword_is_not_counted() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(25, 0)))
                .respond("cat", Err(SearchError::RateLimited { reset_at_ms: None })),
        );
        let cancel = CancellationToken::new();
        let searcher = Searcher::new(
            catalog.clone(),
            Credential::new("id", "secret"),
            SearchOptions::default(),
            cancel.clone(),
        )
        .with_clock(fixed_clock);
        let (kw_tx, kw_queue) = work_queue::<String>();
        let (job_tx, _job_queue) = work_queue::<DownloadJob>();
        let progress = Arc::new(Progress::new());

        kw_tx.send("cat".to_string()).unwrap();
        kw_tx.send("dog".to_string()).unwrap();
        kw_tx.shutdown(1).unwrap();

        let handle = tokio::spawn(searcher.run(kw_queue, job_tx, progress.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();

        let stats = progress.snapshot(Duration::ZERO);
        assert_eq!(stats.keywords_searched, 0);
        assert_eq!(stats.keywords_abandoned, 0);
        assert!(catalog.calls().iter().all(|c| c.keyword == "cat"));
    }

    #[tokio::test]
    async fn test_run_forwards_jobs_and_exits_on_shutdown() {
        let catalog = Arc::new(
            MockCatalog::new()
                .respond("cat", Ok(page_of(2, 0)))
                .respond("dog", Ok(page_of(1, 10))),
        );
        let (kw_tx, kw_queue) = work_queue::<String>();
        let (job_tx, job_queue) = work_queue::<DownloadJob>();
        let progress = Arc::new(Progress::new());

        kw_tx.send("cat".to_string()).unwrap();
        kw_tx.send("dog".to_string()).unwrap();
        kw_tx.shutdown(1).unwrap();

        searcher(catalog)
            .run(kw_queue, job_tx, progress.clone())
            .await;

        let cancel = CancellationToken::new();
        let mut keywords = Vec::new();
        while let Some(job) = job_queue.next(&cancel).await {
            keywords.push(job.searched_keyword);
        }
        assert_eq!(keywords, vec!["cat", "cat", "dog"]);

        let stats = progress.snapshot(Duration::ZERO);
        assert_eq!(stats.keywords_searched, 2);
        assert_eq!(stats.jobs_produced, 3);
    }
}

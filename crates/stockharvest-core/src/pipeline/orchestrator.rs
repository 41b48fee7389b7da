//! Pipeline orchestration: wires the search, transform and writer stages.
//!
//! ```text
//! keywords ─▶ [Searcher × credentials] ─▶ jobs ─▶ [Downloader × workers] ─▶ records ─▶ [MetadataWriter]
//! ```
//!
//! A stage is finished when every one of its workers has returned, never when
//! its input queue happens to be empty. Only then does the next stage receive
//! its shutdown markers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::channel::work_queue;
use super::download::Downloader;
use super::fetch::{HttpImageFetcher, ImageFetcher};
use super::progress::Progress;
use super::search::{SearchOptions, Searcher};
use super::transform::ImageTransformer;
use super::writer::MetadataWriter;
use crate::catalog::{CatalogSearch, ShutterstockCatalog};
use crate::config::Config;
use crate::error::{ConfigError, InputError, Result};
use crate::output::OutputFormat;
use crate::types::{Credential, DownloadJob, HarvestStats, MetadataRecord};

/// Runs one harvest from keyword list to metadata file.
pub struct Harvester {
    config: Config,
    catalog: Arc<dyn CatalogSearch>,
    fetcher: Arc<dyn ImageFetcher>,
    progress: Arc<Progress>,
    cancel: CancellationToken,
}

impl Harvester {
    /// Harvester backed by the Shutterstock catalog and plain HTTP downloads.
    ///
    /// Both stages share one HTTP client and its connection pool.
    pub fn new(config: Config) -> Self {
        let client = reqwest::Client::new();
        let catalog = Arc::new(ShutterstockCatalog::new(&config.search, client.clone()));
        let fetcher = Arc::new(HttpImageFetcher::new(
            client,
            Duration::from_millis(config.download.fetch_timeout_ms),
        ));
        Self::with_collaborators(config, catalog, fetcher)
    }

    /// Harvester with caller-supplied catalog and fetcher.
    pub fn with_collaborators(
        config: Config,
        catalog: Arc<dyn CatalogSearch>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            config,
            catalog,
            fetcher,
            progress: Arc::new(Progress::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Live counters, safe to poll while [`run`](Self::run) is in progress.
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Token that stops every worker from taking new work when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Where the metadata file for `root_dir` is written.
    pub fn output_path(&self, root_dir: &Path) -> Result<PathBuf> {
        let format = self.output_format()?;
        let file_name = Path::new(&self.config.output.file_name).with_extension(format.extension());
        Ok(root_dir.join(file_name))
    }

    fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::parse(&self.config.output.format).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "output.format must be csv or jsonl, got {:?}",
                self.config.output.format
            ))
            .into()
        })
    }

    /// Search every keyword, download and crop every match into `root_dir`,
    /// and record one metadata row per saved image.
    ///
    /// Only setup failures are returned as errors. Failed pages, jobs and rows
    /// are logged, counted in the returned stats and otherwise skipped.
    pub async fn run(
        &self,
        keywords: Vec<String>,
        credentials: Vec<Credential>,
        root_dir: &Path,
    ) -> Result<HarvestStats> {
        if credentials.is_empty() {
            return Err(InputError::EmptyCredentials.into());
        }
        let start = Instant::now();

        tokio::fs::create_dir_all(root_dir).await?;
        let output_path = self.output_path(root_dir)?;
        let writer = MetadataWriter::create(&output_path, self.output_format()?)?;

        let search_workers = credentials.len();
        let transform_workers = self.config.download.worker_count().max(1);
        tracing::info!(
            keywords = keywords.len(),
            search_workers,
            transform_workers,
            catalog = self.catalog.name(),
            "Starting harvest into {:?}",
            root_dir
        );

        let (keyword_tx, keyword_queue) = work_queue::<String>();
        let (job_tx, job_queue) = work_queue::<DownloadJob>();
        let (record_tx, record_queue) = work_queue::<MetadataRecord>();

        // Every keyword is queued ahead of the search markers, so each
        // searcher only sees its marker once the keywords are taken.
        for keyword in keywords {
            keyword_tx.send(keyword)?;
        }
        keyword_tx.shutdown(search_workers)?;

        let writer_task = tokio::spawn(writer.run(record_queue, self.progress()));

        let downloader = Arc::new(Downloader::new(
            Arc::clone(&self.fetcher),
            ImageTransformer::new(&self.config.download, self.config.limits.clone()),
            root_dir.to_path_buf(),
        ));
        let mut transform_set = JoinSet::new();
        for _ in 0..transform_workers {
            transform_set.spawn(Arc::clone(&downloader).run(
                job_queue.clone(),
                record_tx.clone(),
                self.progress(),
                self.cancel.clone(),
            ));
        }

        let options = SearchOptions::from(&self.config.search);
        let mut search_set = JoinSet::new();
        for credential in credentials {
            let searcher = Searcher::new(
                Arc::clone(&self.catalog),
                credential,
                options.clone(),
                self.cancel.clone(),
            );
            search_set.spawn(searcher.run(keyword_queue.clone(), job_tx.clone(), self.progress()));
        }

        while let Some(joined) = search_set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Search worker panicked: {e}");
            }
        }
        tracing::info!("Search stage finished");
        job_tx.shutdown(transform_workers)?;

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = transform_set.join_next().await {
            match joined {
                Ok(tally) => {
                    succeeded += tally.succeeded;
                    failed += tally.failed;
                }
                Err(e) => tracing::error!("Transform worker panicked: {e}"),
            }
        }
        tracing::info!(succeeded, failed, "Transform stage finished");
        if record_tx.shutdown(1).is_err() {
            tracing::error!("Writer exited before the end of the run");
        }

        if let Err(e) = writer_task.await {
            tracing::error!("Writer panicked: {e}");
        }

        let stats = self.progress.snapshot(start.elapsed());
        tracing::info!(
            rows = stats.rows_written,
            jobs_failed = stats.jobs_failed,
            keywords_abandoned = stats.keywords_abandoned,
            "Harvest complete in {:?}",
            stats.elapsed
        );
        Ok(stats)
    }
}

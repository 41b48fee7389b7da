//! Transform stage: download, crop and save one image per job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::channel::{PipelineStage, StageTally, WorkQueue, WorkSender};
use super::fetch::ImageFetcher;
use super::progress::Progress;
use super::transform::{ImageTransformer, OUTPUT_EXTENSION};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DownloadJob, MetadataRecord};

/// Text before the first space of a keyword (the whole keyword if it has none).
pub fn first_word(keyword: &str) -> &str {
    keyword.split(' ').next().unwrap_or(keyword)
}

/// Deterministic destination of a job's image.
///
/// Jobs sharing the first keyword word and photo id map to the same file; the
/// last one written wins.
pub fn destination(root: &Path, job: &DownloadJob) -> PathBuf {
    root.join(format!(
        "{}_{}.{}",
        first_word(&job.searched_keyword),
        job.photo_id,
        OUTPUT_EXTENSION
    ))
}

/// Turns download jobs into metadata records.
pub struct Downloader {
    fetcher: Arc<dyn ImageFetcher>,
    transformer: ImageTransformer,
    root: PathBuf,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, transformer: ImageTransformer, root: PathBuf) -> Self {
        Self {
            fetcher,
            transformer,
            root,
        }
    }

    /// Fetch, transform and save one job's image.
    pub async fn process_job(&self, job: DownloadJob) -> PipelineResult<MetadataRecord> {
        let start = std::time::Instant::now();

        let raw = self.fetcher.fetch(&job.thumb_url).await?;
        let fetch_time = start.elapsed();

        let transformed = self.transformer.transform(raw, &job.photo_id).await?;

        let path = destination(&self.root, &job);
        tokio::fs::write(&path, &transformed.bytes)
            .await
            .map_err(|source| PipelineError::Save {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            photo_id = %job.photo_id,
            "Saved {:?} ({}x{}, fetch {:?}, total {:?})",
            path,
            transformed.width,
            transformed.height,
            fetch_time,
            start.elapsed()
        );

        Ok(job.into_record(path))
    }

    /// Run one transform worker until its shutdown marker or cancellation.
    ///
    /// Failed jobs are logged and dropped; nothing is retried.
    pub async fn run(
        self: Arc<Self>,
        jobs: WorkQueue<DownloadJob>,
        records: WorkSender<MetadataRecord>,
        progress: Arc<Progress>,
        cancel: CancellationToken,
    ) -> StageTally {
        let stage = PipelineStage::new(jobs, records, cancel.clone());
        stage
            .run_fallible(
                |job| {
                    let this = Arc::clone(&self);
                    let progress = Arc::clone(&progress);
                    let cancel = cancel.clone();
                    async move {
                        let photo_id = job.photo_id.clone();
                        let result = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(None),
                            result = this.process_job(job) => result,
                        };
                        match result {
                            Ok(record) => {
                                progress.record_produced();
                                Ok(record)
                            }
                            Err(e) => {
                                progress.job_failed();
                                Err(Some((photo_id, e)))
                            }
                        }
                    }
                },
                |failure: &Option<(String, PipelineError)>| {
                    if let Some((photo_id, e)) = failure {
                        tracing::warn!(photo_id = %photo_id, kind = e.kind(), "Dropping job: {e}");
                    }
                },
            )
            .await
    }
}

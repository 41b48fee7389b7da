//! Writer stage: the single consumer of metadata records.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::channel::{WorkItem, WorkQueue};
use super::progress::Progress;
use crate::error::PipelineError;
use crate::output::{OutputFormat, RowWriter};
use crate::types::MetadataRecord;

/// Owns the output sink for the whole run.
pub struct MetadataWriter<W: Write = BufWriter<File>> {
    rows: RowWriter<W>,
    path: PathBuf,
}

impl MetadataWriter {
    /// Create (truncating) the output file and write the header.
    pub fn create(path: &Path, format: OutputFormat) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file), format, path.to_path_buf())
    }
}

impl<W: Write> MetadataWriter<W> {
    /// Wrap an already-open sink and write the header.
    pub fn from_writer(writer: W, format: OutputFormat, path: PathBuf) -> io::Result<Self> {
        let mut rows = RowWriter::new(writer, format);
        rows.write_header()?;
        Ok(Self { rows, path })
    }

    /// Write one record, reporting a failure as a dropped row.
    pub fn write_record(&mut self, record: &MetadataRecord) -> Result<(), PipelineError> {
        self.rows.write(record).map_err(|e| PipelineError::RowWrite {
            photo_id: record.photo_id.clone(),
            message: e.to_string(),
        })
    }

    /// Consume records until the shutdown marker, then flush and close.
    ///
    /// Cancellation is not observed here. Upstream stages stop early and the
    /// orchestrator still sends the marker, so every record already produced
    /// reaches the sink.
    pub async fn run(mut self, records: WorkQueue<MetadataRecord>, progress: Arc<Progress>) -> W {
        while let Some(WorkItem::Data(record)) = records.recv().await {
            match self.write_record(&record) {
                Ok(()) => progress.row_written(),
                Err(e) => {
                    progress.row_failed();
                    tracing::warn!(photo_id = %record.photo_id, "Dropping row: {e}");
                }
            }
        }

        if let Err(e) = self.rows.flush() {
            tracing::error!("Failed to flush {:?}: {e}", self.path);
        }
        tracing::info!(
            rows = self.rows.rows_written(),
            "Metadata written to {:?}",
            self.path
        );
        self.rows.into_inner()
    }
}

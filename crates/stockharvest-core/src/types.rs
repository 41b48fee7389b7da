//! Core data types flowing through the harvest pipeline.
//!
//! Keywords become [`DownloadJob`]s in the search stage, jobs become
//! [`MetadataRecord`]s in the transform stage, and records become output rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Catalog API credential, bound to exactly one search worker.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Client id (`username` in credential files)
    #[serde(alias = "username")]
    pub identifier: String,

    /// Client secret (`password` in credential files)
    #[serde(alias = "password")]
    pub secret: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A catalog category attached to a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// One catalog search hit awaiting download and transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// The keyword whose search produced this job
    pub searched_keyword: String,

    /// Catalog photo id
    pub photo_id: String,

    /// Photo keywords, in catalog order
    pub keywords: Vec<String>,

    /// Photo description
    pub description: String,

    /// Photo categories, in catalog order
    pub category: Vec<Category>,

    /// Thumbnail asset URL
    pub thumb_url: String,

    /// Thumbnail width in pixels, as reported by the catalog
    pub thumb_width: u32,

    /// Thumbnail height in pixels, as reported by the catalog
    pub thumb_height: u32,
}

impl DownloadJob {
    /// Build the metadata record for this job once its image is on disk.
    pub fn into_record(self, file_path: PathBuf) -> MetadataRecord {
        MetadataRecord {
            searched_keyword: self.searched_keyword,
            photo_id: self.photo_id,
            keywords: self.keywords,
            description: self.description,
            category: self.category,
            file_path,
        }
    }
}

/// Writer-ready representation of one successfully processed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub searched_keyword: String,
    pub photo_id: String,
    pub keywords: Vec<String>,
    pub description: String,
    pub category: Vec<Category>,

    /// Where the transformed image was saved
    pub file_path: PathBuf,
}

/// Summary of a completed harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Keywords whose pagination loop ran to completion or abandonment
    pub keywords_searched: u64,

    /// Keywords given up on after repeated search failures
    pub keywords_abandoned: u64,

    /// Download jobs handed to the transform stage
    pub jobs_produced: u64,

    /// Metadata records handed to the writer
    pub records_produced: u64,

    /// Jobs dropped in the transform stage
    pub jobs_failed: u64,

    /// Data rows written (header excluded)
    pub rows_written: u64,

    /// Rows dropped by the writer
    pub rows_failed: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

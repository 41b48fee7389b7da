//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Catalog search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Catalog API base URL
    pub endpoint: String,

    /// Results requested per page; a shorter page ends pagination
    pub page_size: u32,

    /// Consecutive non-rate-limit failures before a keyword is abandoned
    pub max_failures: u32,

    /// Fixed sleep between retries of a failed page, in seconds
    pub failure_backoff_secs: u64,

    /// Extra sleep added after a rate-limit reset time, in seconds
    pub rate_limit_slack_secs: u64,

    /// Reset horizon assumed when a 429 carries no reset time, in seconds
    pub rate_limit_fallback_secs: u64,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Result detail level requested from the catalog
    pub view: String,

    /// Result language
    pub language: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.shutterstock.com/v2".to_string(),
            page_size: 25,
            max_failures: 3,
            failure_backoff_secs: 10,
            rate_limit_slack_secs: 60,
            rate_limit_fallback_secs: 60 * 60,
            request_timeout_ms: 30_000,
            view: "full".to_string(),
            language: "en".to_string(),
        }
    }
}

impl SearchConfig {
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    pub fn rate_limit_slack(&self) -> Duration {
        Duration::from_secs(self.rate_limit_slack_secs)
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_secs(self.rate_limit_fallback_secs)
    }
}

/// Image download and transform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Fixed transform pool size; derived from CPU count when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Transform workers per available CPU when `workers` is unset
    pub worker_multiplier: usize,

    /// Image fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,

    /// Fraction of the image height kept, measured from the top
    pub crop_ratio: f64,

    /// JPEG quality of the saved image (1-100)
    pub jpeg_quality: u8,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: None,
            worker_multiplier: 2,
            fetch_timeout_ms: 30_000,
            crop_ratio: 0.93,
            jpeg_quality: 100,
        }
    }
}

impl DownloadConfig {
    /// Resolve the transform pool size.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            cpus * self.worker_multiplier
        })
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode + crop + encode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metadata file name, created inside the root directory
    pub file_name: String,

    /// Output format ("csv" or "jsonl")
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: "metadata.csv".to_string(),
            format: "csv".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

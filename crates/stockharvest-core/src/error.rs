//! Error types for the stockharvest pipeline.
//!
//! Errors are organized by stage. Only [`HarvestError`] ever reaches the
//! caller of [`crate::Harvester::run`], and only for failures that happen
//! before the pipeline starts. [`SearchError`] and [`PipelineError`] describe
//! a single unit of work (one page, one job, one row) and are logged and
//! discarded by the worker that produced them.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for stockharvest operations.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Keyword or credential input errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage queue lost its consumers before the run was wired up
    #[error("Pipeline setup failed: {0}")]
    Queue(#[from] crate::pipeline::QueueClosed),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors loading the keyword list or the credential file.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials in {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No credentials found in {0}")]
    NoCredentials(PathBuf),

    #[error("At least one credential is required to start the search stage")]
    EmptyCredentials,
}

/// A failed catalog search request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// HTTP 429. `reset_at_ms` is the epoch-millis reset time from the
    /// error payload, if the catalog sent one.
    #[error("Rate limited (reset at {reset_at_ms:?})")]
    RateLimited { reset_at_ms: Option<u64> },

    /// Any other non-success status from the catalog
    #[error("Catalog HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection, TLS or timeout failure before a status was received
    #[error("Catalog request failed: {0}")]
    Transport(String),

    /// The response body did not match the expected shape
    #[error("Failed to parse catalog response: {0}")]
    Parse(String),
}

/// Per-unit failures in the transform and writer stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image retrieval failed (transport error or non-success status)
    #[error("Failed to fetch {url}: {message}")]
    AssetFetch {
        url: String,
        status_code: Option<u16>,
        message: String,
    },

    /// Image decoding failed
    #[error("Decode error for photo {photo_id}: {message}")]
    Decode { photo_id: String, message: String },

    /// Re-encoding the cropped image failed
    #[error("Encode error for photo {photo_id}: {message}")]
    Encode { photo_id: String, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for photo {photo_id} after {timeout_ms}ms")]
    Timeout {
        photo_id: String,
        stage: String,
        timeout_ms: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: photo {photo_id} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        photo_id: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Writing the encoded image to disk failed
    #[error("Failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing one output row failed
    #[error("Failed to write row for photo {photo_id}: {message}")]
    RowWrite { photo_id: String, message: String },
}

impl PipelineError {
    /// Short stage label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssetFetch { .. } => "fetch",
            Self::Decode { .. } | Self::ImageTooLarge { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::Timeout { .. } => "timeout",
            Self::Save { .. } => "save",
            Self::RowWrite { .. } => "write",
        }
    }
}

/// Convenience type alias for stockharvest results.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

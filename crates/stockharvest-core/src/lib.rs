//! stockharvest core - keyword-driven stock photo harvesting.
//!
//! Given a list of search keywords and a set of catalog credentials, the
//! harvester pages through the catalog's image search for every keyword,
//! downloads each match's thumbnail, crops away the bottom watermark band,
//! saves it as JPEG and records one metadata row per saved image.
//!
//! # Architecture
//!
//! ```text
//! keywords → Search (1 per credential) → jobs → Download (CPU × 2) → records → Writer (1) → metadata.csv
//! ```
//!
//! Failures never abort a run: a failing page is retried and eventually the
//! keyword is abandoned, a failing job or row is logged and dropped. Only
//! setup problems (bad config, unreadable inputs) surface as errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stockharvest_core::{inputs, Config, Harvester};
//!
//! #[tokio::main]
//! async fn main() -> stockharvest_core::Result<()> {
//!     let config = Config::load()?;
//!     let keywords = inputs::load_keywords("keywords.txt".as_ref())?;
//!     let credentials = inputs::load_credentials("credentials.json".as_ref())?;
//!
//!     let harvester = Harvester::new(config);
//!     let stats = harvester.run(keywords, credentials, "./out".as_ref()).await?;
//!     println!("{} rows written", stats.rows_written);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod inputs;
pub mod output;
pub mod pipeline;
pub mod types;

pub use catalog::{CatalogSearch, ShutterstockCatalog};
pub use config::Config;
pub use error::{
    ConfigError, HarvestError, InputError, PipelineError, PipelineResult, Result, SearchError,
};
pub use output::{OutputFormat, RowWriter};
pub use pipeline::{Harvester, ImageFetcher, Progress};
pub use types::{Credential, DownloadJob, HarvestStats, MetadataRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! The three-stage harvest pipeline.
//!
//! - **search**: one worker per credential pages through the catalog and emits download jobs
//! - **download**: a worker pool fetches, crops and saves each job's image
//! - **writer**: a single worker appends one metadata row per saved image
//! - **orchestrator**: seeds the keywords, runs the stages and shuts them down in order
//! - **channel**: shared work queues with explicit shutdown markers

pub mod channel;
pub mod download;
pub mod fetch;
pub mod orchestrator;
pub mod progress;
pub mod search;
pub mod transform;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use channel::{work_queue, PipelineStage, QueueClosed, StageTally, WorkItem, WorkQueue, WorkSender};
pub use download::{destination, first_word, Downloader};
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use orchestrator::Harvester;
pub use progress::Progress;
pub use search::{KeywordHarvest, SearchOptions, Searcher};
pub use transform::{ImageTransformer, TransformedImage};
pub use writer::MetadataWriter;

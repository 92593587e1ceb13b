//! Fetching, batching and the ingestion cycle
//!
//! - [`fetcher`] - proxied/direct HTTP with randomized pacing
//! - [`batch`] - chunked fan-out with cooldowns
//! - [`url`] - upstream endpoint shapes
//! - [`sources`] - one scrape operation per upstream
//! - [`pipeline`] - the scheduled ingestion cycle

pub mod batch;
pub mod fetcher;
pub mod pipeline;
pub mod sources;
pub mod url;

pub use batch::{process_in_batches, BatchConfig, BatchOutcome, BatchScheduler};
pub use fetcher::{DelayedFetcher, FetchConfig, ProxyConfig};
pub use pipeline::{CycleReport, IngestStep, IngestionPipeline, StepOutcome};
pub use sources::SourceScraper;
pub use url::{SourceUrls, SourcesConfig};

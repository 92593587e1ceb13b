//! lagoon - Venice public information scraper and cache
//!
//! Gathers flight boards, train boards, bus and waterbus stop times, tide
//! extremes, air quality, tourism and population figures from public
//! sources, caches the live ones with time-of-day aware expiry and pushes
//! daily snapshots into a hierarchical record store.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`time`] - Civil time in the configured zone and TTL arithmetic
//! - [`cache`] - Single-flight get-or-set over Redis or memory
//! - [`crawler`] - Fetching, batching and the ingestion cycle
//! - [`parser`] - Extraction from upstream HTML and JSON
//! - [`models`] - Core data structures and types
//! - [`storage`] - Hierarchical record sinks
//! - [`feeds`] - Cached request-time feeds
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lagoon::cache::Cache;
//! use lagoon::config::Config;
//! use lagoon::crawler::{DelayedFetcher, SourceScraper};
//! use lagoon::feeds::LiveFeeds;
//! use lagoon::time::TimeService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let time = Arc::new(TimeService::new(&config.time.timezone)?);
//!     let fetcher = Arc::new(DelayedFetcher::new(&config.fetch)?);
//!     let scraper = SourceScraper::new(fetcher, Arc::clone(&time), &config.sources, &config.batch)?;
//!     let cache = Cache::from_config(&config.cache, time).await?;
//!
//!     let feeds = LiveFeeds::new(Arc::new(cache), Arc::new(scraper));
//!     let boards = feeds.airplanes().await?;
//!     println!("{} arrivals", boards.arrival.flights.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod feeds;
pub mod models;
pub mod parser;
pub mod storage;
pub mod time;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{Cache, TtlSpec};
    pub use crate::config::Config;
    pub use crate::crawler::{DelayedFetcher, IngestionPipeline, SourceScraper};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::feeds::LiveFeeds;
    pub use crate::storage::{MemorySink, RecordSink, RestTreeSink};
    pub use crate::time::TimeService;
}

// Direct re-exports for convenience
pub use models::{Airplanes, StopTimeRecord, TrainDirection, TrainTimetable, TransitMode};

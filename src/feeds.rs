//! Request-time feeds served through the cache
//!
//! Route handlers call these instead of scraping on every request. Live
//! sources are scraped on a miss; persisted datasets go through
//! [`LiveFeeds::cached`] with a producer that reads the record store.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::cache::{Cache, TtlSpec};
use crate::crawler::sources::SourceScraper;
use crate::error::Result;
use crate::models::{Airplanes, TrainDirection, TrainTimetable};
use crate::time::DEFAULT_BOUNDARIES;

/// Cache key of the flight boards
pub const AIRPLANES_KEY: &str = "airplanes";

/// Train boards change minute by minute
pub const TRAINS_TTL_SECS: u64 = 600;

pub fn trains_key(direction: TrainDirection) -> &'static str {
    match direction {
        TrainDirection::Arrivals => "VeniceTrainsArrivalTime",
        TrainDirection::Departures => "VeniceTrainsDepartureTime",
    }
}

pub struct LiveFeeds {
    cache: Arc<Cache>,
    scraper: Arc<SourceScraper>,
}

impl LiveFeeds {
    pub fn new(cache: Arc<Cache>, scraper: Arc<SourceScraper>) -> Self {
        Self { cache, scraper }
    }

    /// Arrivals and departures, kept until the next 6-hour boundary
    pub async fn airplanes(&self) -> Result<Airplanes> {
        let ttl = self.cache.time().next_boundary_ttl(&DEFAULT_BOUNDARIES)?;
        self.cache
            .get_or_set(AIRPLANES_KEY, || self.scraper.scrape_flights(), TtlSpec::Fixed(ttl))
            .await
    }

    pub async fn trains(&self, direction: TrainDirection) -> Result<TrainTimetable> {
        self.cache
            .get_or_set(
                trains_key(direction),
                || self.scraper.scrape_trains(direction),
                TtlSpec::Fixed(TRAINS_TTL_SECS),
            )
            .await
    }

    /// Any other dataset, e.g. a daily snapshot read with `TtlSpec::daily()`
    pub async fn cached<T, F, Fut>(&self, key: &str, ttl: TtlSpec, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cache.get_or_set(key, producer, ttl).await
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}

//! Per-source scrape operations
//!
//! Each operation fetches one upstream and runs its extractor. Which fetch
//! path a source uses:
//!
//! | Source          | Fetch                              |
//! |-----------------|------------------------------------|
//! | Flight tracker  | direct, staggered                  |
//! | Train monitor   | direct                             |
//! | Transit stops   | proxied with fallback, batched     |
//! | Tide API        | direct, `Authorization` header     |
//! | Air quality     | direct                             |
//! | Tourism portal  | direct                             |
//! | Population page | direct                             |

use serde_json::Value;
use std::sync::Arc;

use crate::crawler::batch::{BatchConfig, BatchScheduler};
use crate::crawler::fetcher::DelayedFetcher;
use crate::crawler::url::{SourceUrls, SourcesConfig};
use crate::error::{Error, Result};
use crate::models::{
    Airplanes, FlightScrapeResult, PopulationRow, StopTimeRecord, TideReport, TideWindow,
    TourismRow, TrainDirection, TrainTimetable, TransitMode,
};
use crate::parser;
use crate::time::{CivilTime, TimeService};

/// Scrapes every upstream through one shared fetcher
pub struct SourceScraper {
    fetcher: Arc<DelayedFetcher>,
    time: Arc<TimeService>,
    urls: SourceUrls,
    sources: SourcesConfig,
    batch: BatchScheduler,
}

impl SourceScraper {
    pub fn new(
        fetcher: Arc<DelayedFetcher>,
        time: Arc<TimeService>,
        sources: &SourcesConfig,
        batch: &BatchConfig,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            time,
            urls: SourceUrls::new(sources)?,
            sources: sources.clone(),
            batch: BatchScheduler::from_config(batch)?,
        })
    }

    pub fn urls(&self) -> &SourceUrls {
        &self.urls
    }

    /// Arrivals and departures for the current 6-hour window
    ///
    /// Both boards are requested together, each after its own random
    /// stagger. Either failing fails the whole scrape.
    pub async fn scrape_flights(&self) -> Result<Airplanes> {
        let now = self.time.now();

        let arrival = DelayedFetcher::delay_then(self.fetcher.stagger_delay(), || {
            self.scrape_flight_board(true, now)
        });
        let departure = DelayedFetcher::delay_then(self.fetcher.stagger_delay(), || {
            self.scrape_flight_board(false, now)
        });

        let (arrival, departure) = tokio::try_join!(arrival, departure)?;
        Ok(Airplanes { arrival, departure })
    }

    /// One flight board for the window containing `at`
    pub async fn scrape_flight_board(
        &self,
        is_arrival: bool,
        at: CivilTime,
    ) -> Result<FlightScrapeResult> {
        let url = self.urls.flights(is_arrival, at.year, at.month, at.day, at.hour);
        tracing::info!(url = %url, is_arrival, "Scraping flight board");

        let html = self.fetcher.get_text(&url).await?;
        let result = parser::extract_flights(&html, is_arrival)?;

        tracing::info!(flights = result.flights.len(), is_arrival, "Flight board scraped");
        Ok(result)
    }

    pub async fn scrape_trains(&self, direction: TrainDirection) -> Result<TrainTimetable> {
        let url = self.urls.trains(direction);
        tracing::info!(url = %url, direction = %direction, "Scraping train board");

        let html = self.fetcher.get_text(&url).await?;
        Ok(parser::extract_train_timetable(&html)?)
    }

    /// Today's departures at every configured stop of `mode`
    ///
    /// A stop that cannot be fetched or parsed is logged and left out.
    pub async fn scrape_transit(&self, mode: TransitMode) -> Result<Vec<StopTimeRecord>> {
        let date = self.time.now().iso_date();
        let stops = self.sources.stops(mode).to_vec();
        tracing::info!(mode = %mode, stops = stops.len(), date = %date, "Scraping transit stops");

        let outcome = self
            .batch
            .run(stops, |stop_id: String| {
                let url = self.urls.transit(&date, mode, &stop_id);
                async move {
                    let payload: Value = self.fetcher.secure_get_json(&url).await?;
                    let records = parser::extract_stop_times(&payload, &stop_id)?;
                    tracing::debug!(stop_id = %stop_id, records = records.len(), "Stop scraped");
                    Ok::<_, Error>(records)
                }
            })
            .await;

        let records: Vec<StopTimeRecord> = outcome.results.into_iter().flatten().collect();
        tracing::info!(
            mode = %mode,
            records = records.len(),
            failed_stops = outcome.failed,
            "Transit scrape finished"
        );
        Ok(records)
    }

    /// Tide extremes from today to tomorrow
    pub async fn fetch_tides(&self) -> Result<TideWindow> {
        let (start, end) = self.time.today_and_tomorrow();
        let url = self.urls.tides(&start, &end);
        tracing::info!(start = %start, end = %end, "Fetching tide extremes");

        let report: TideReport = self
            .fetcher
            .get_json_with_headers(&url, &[("Authorization", self.sources.tide_api_key.as_str())])
            .await?;

        Ok(TideWindow { start, end, report })
    }

    /// Hourly pollutant series, passed through as returned
    pub async fn fetch_air_quality(&self) -> Result<Value> {
        let url = self.urls.air_quality();
        tracing::info!(url = %url, "Fetching air quality");
        Ok(self.fetcher.get_json(&url).await?)
    }

    /// Last year's regional tourism movement
    pub async fn scrape_tourism(&self) -> Result<Vec<TourismRow>> {
        let year = self.time.now().year - 1;
        let url = self.urls.tourism(year);
        tracing::info!(url = %url, year, "Scraping tourism statistics");

        let html = self.fetcher.get_text(&url).await?;
        Ok(parser::extract_tourism(&html)?)
    }

    /// Latest population figures, `None` when the page has no data row
    pub async fn scrape_population(&self) -> Result<Option<PopulationRow>> {
        let url = self.urls.population();
        tracing::info!(url = %url, "Scraping population statistics");

        let html = self.fetcher.get_text(url).await?;
        Ok(parser::extract_population(&html))
    }
}

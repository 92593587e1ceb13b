//! Scheduled ingestion cycle
//!
//! One cycle runs every dataset step in a fixed order. Each step scrapes its
//! source and, when there is something to store, replaces the dataset in the
//! sink: the dataset root is removed first, then the new snapshot is written.
//!
//! ```text
//! population ─▶ air quality ─▶ tourism ─▶ tides ─▶ buses ─▶ boats ─▶ close sink
//! ```
//!
//! A failing or panicking step is recorded in the [`CycleReport`] and the
//! cycle moves on. The sink is closed once the last step has run.
//!
//! Between the remove and the write a reader sees the dataset as empty.

use futures::future::try_join_all;
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::crawler::sources::SourceScraper;
use crate::error::{Error, Result};
use crate::models::{PopulationSnapshot, StopTimeRecord, TransitMode};
use crate::storage::RecordSink;
use crate::time::TimeService;

/// Sink root of the dashboard datasets
pub const DASHBOARD_ROOT: &str = "dashboard/data";

// ============================================================================
// Steps and outcomes
// ============================================================================

/// One dataset refreshed by the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestStep {
    Population,
    AirQuality,
    Tourism,
    Tides,
    Buses,
    Boats,
}

impl IngestStep {
    /// Execution order
    pub const ALL: [IngestStep; 6] = [
        Self::Population,
        Self::AirQuality,
        Self::Tourism,
        Self::Tides,
        Self::Buses,
        Self::Boats,
    ];

    /// Sink path replaced by this step
    pub fn dataset_path(&self) -> String {
        match self {
            Self::Population => format!("{DASHBOARD_ROOT}/VenicePopulation"),
            Self::AirQuality => format!("{DASHBOARD_ROOT}/VeniceAir"),
            Self::Tourism => format!("{DASHBOARD_ROOT}/Tourism"),
            Self::Tides => format!("{DASHBOARD_ROOT}/Tides"),
            Self::Buses => TransitMode::Bus.sink_path().to_string(),
            Self::Boats => TransitMode::Boat.sink_path().to_string(),
        }
    }
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Population => "population",
            Self::AirQuality => "air_quality",
            Self::Tourism => "tourism",
            Self::Tides => "tides",
            Self::Buses => "buses",
            Self::Boats => "boats",
        };
        f.pad(name)
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Dataset replaced with `writes` set/push operations
    Persisted { writes: usize },
    /// Source had nothing to store
    Skipped,
    /// Scrape or persist failed, or the step panicked
    Failed(String),
}

/// Per-step results of one cycle, in execution order
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub steps: Vec<(IngestStep, StepOutcome)>,
}

impl CycleReport {
    pub fn outcome(&self, step: IngestStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Persisted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|(_, o)| pred(o)).count()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs ingestion cycles against one sink
pub struct IngestionPipeline {
    scraper: Arc<SourceScraper>,
    sink: Arc<dyn RecordSink>,
    time: Arc<TimeService>,
}

impl IngestionPipeline {
    pub fn new(scraper: Arc<SourceScraper>, sink: Arc<dyn RecordSink>, time: Arc<TimeService>) -> Self {
        Self {
            scraper,
            sink,
            time,
        }
    }

    /// Run every step once, then close the sink
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        tracing::info!("Ingestion cycle started");

        let mut report = CycleReport::default();
        for step in IngestStep::ALL {
            let outcome = self.run_isolated(step).await;
            report.steps.push((step, outcome));
        }

        if let Err(e) = self.sink.close().await {
            tracing::warn!(error = %e, "Failed to close sink");
        }

        tracing::info!(
            persisted = report.persisted(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion cycle completed"
        );
        report
    }

    /// Run one step, turning errors and panics into an outcome
    pub async fn run_isolated(&self, step: IngestStep) -> StepOutcome {
        tracing::info!(step = %step, "Step started");

        match AssertUnwindSafe(self.run_step(step)).catch_unwind().await {
            Ok(Ok(Some(writes))) => {
                tracing::info!(step = %step, writes, "Step persisted");
                StepOutcome::Persisted { writes }
            }
            Ok(Ok(None)) => {
                tracing::warn!(step = %step, "No new data found, step skipped");
                StepOutcome::Skipped
            }
            Ok(Err(e)) => {
                tracing::error!(step = %step, error = %e, category = e.category().label(), "Step failed");
                StepOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let err = Error::other(format!("step panicked: {}", panic_message(panic.as_ref())));
                tracing::error!(step = %step, error = %err, category = err.category().label(), "Step panicked");
                StepOutcome::Failed(err.to_string())
            }
        }
    }

    /// Scrape and persist; `None` when there was nothing to store
    async fn run_step(&self, step: IngestStep) -> Result<Option<usize>> {
        let date = self.time.now().iso_date();
        let root = step.dataset_path();

        match step {
            IngestStep::Population => {
                let Some(row) = self.scraper.scrape_population().await? else {
                    return Ok(None);
                };
                let snapshot = PopulationSnapshot::from_row(&row, self.timestamp());
                self.replace(&root, &format!("{root}/{date}"), serde_json::to_value(snapshot)?)
                    .await
            }
            IngestStep::AirQuality => {
                let data = self.scraper.fetch_air_quality().await?;
                if data.is_null() {
                    return Ok(None);
                }
                self.replace(&root, &format!("{root}/{date}"), json!({ "data": data }))
                    .await
            }
            IngestStep::Tourism => {
                let rows = self.scraper.scrape_tourism().await?;
                self.replace(&root, &format!("{root}/{date}"), json!({ "data": rows }))
                    .await
            }
            IngestStep::Tides => {
                let window = self.scraper.fetch_tides().await?;
                let path = format!("{root}/{}_to_{}", window.start, window.end);
                let value = json!({
                    "tides": window.report.data,
                    "meta": window.report.meta,
                    "timestamp": self.timestamp(),
                });
                self.replace(&root, &path, value).await
            }
            IngestStep::Buses => {
                let records = self.scraper.scrape_transit(TransitMode::Bus).await?;
                self.replace_records(&root, records).await
            }
            IngestStep::Boats => {
                let records = self.scraper.scrape_transit(TransitMode::Boat).await?;
                self.replace_records(&root, records).await
            }
        }
    }

    async fn replace(&self, root: &str, path: &str, value: Value) -> Result<Option<usize>> {
        self.clear(root).await;
        self.sink.set(path, value).await?;
        Ok(Some(1))
    }

    /// Replace a pushed collection; an empty scrape leaves the old one in place
    async fn replace_records(&self, root: &str, records: Vec<StopTimeRecord>) -> Result<Option<usize>> {
        if records.is_empty() {
            return Ok(None);
        }

        self.clear(root).await;
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let ids = try_join_all(values.into_iter().map(|v| self.sink.push(root, v))).await?;

        Ok(Some(ids.len()))
    }

    /// Remove a dataset root; a failure is logged and the write still happens
    async fn clear(&self, root: &str) {
        if let Err(e) = self.sink.remove(root).await {
            tracing::warn!(path = %root, error = %e, "Failed to delete existing data");
        }
    }

    fn timestamp(&self) -> String {
        self.time.now_local().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Core data structures and types
//!
//! Record shapes produced by the extractors and consumed by the cache,
//! the persistence sink and route handlers. Field names are part of the
//! external contract and serialize in camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Transport mode segment of the transit stop-times endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitMode {
    Bus,
    Boat,
}

impl TransitMode {
    /// URL segment used by the stop-times API
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Bus => "AUT",
            Self::Boat => "NAV",
        }
    }

    /// Record-store path the mode's records are pushed under
    pub fn sink_path(&self) -> &'static str {
        match self {
            Self::Bus => "busData",
            Self::Boat => "boatData",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus"),
            Self::Boat => write!(f, "boat"),
        }
    }
}

/// One departure at a transit stop
///
/// Only emitted when the departure time is present and not the
/// `Undefined` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeRecord {
    pub stop_id: String,
    pub line_name: Option<String>,
    pub line_path: Option<String>,
    /// Departure as published, `HH:MM:SS`
    pub departure_text: String,
    /// Departure as seconds since midnight, `0..86400`
    pub departure_seconds: u32,
    pub next_stop_name: Option<String>,
    pub next_stop_time: Option<String>,
    pub terminal_name: Option<String>,
    pub terminal_time: Option<String>,
}

/// One flight row, passed through as published by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightRow(pub Value);

impl FlightRow {
    /// Look up a top-level field of the row
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Arrivals or departures board extracted from the flight tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightScrapeResult {
    pub date: String,
    pub airport_name: String,
    pub app_host_url: String,
    pub flights: Vec<FlightRow>,
    pub is_arrival: bool,
}

/// Both flight boards, the cached `airplanes` dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airplanes {
    pub arrival: FlightScrapeResult,
    pub departure: FlightScrapeResult,
}

/// Train board direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainDirection {
    Arrivals,
    Departures,
}

impl TrainDirection {
    pub fn is_arrivals(&self) -> bool {
        matches!(self, Self::Arrivals)
    }
}

impl fmt::Display for TrainDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arrivals => write!(f, "arrivals"),
            Self::Departures => write!(f, "departures"),
        }
    }
}

/// Column id -> cell text (or image source for icon cells)
pub type TimetableRow = BTreeMap<String, String>;

/// Train board: row 0 is the header map, then one map per train
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainTimetable {
    pub rows: Vec<TimetableRow>,
}

impl TrainTimetable {
    pub fn new(header: TimetableRow, trains: Vec<TimetableRow>) -> Self {
        let mut rows = Vec::with_capacity(trains.len() + 1);
        rows.push(header);
        rows.extend(trains);
        Self { rows }
    }

    /// Header map (column id -> header text)
    pub fn header(&self) -> Option<&TimetableRow> {
        self.rows.first()
    }

    /// One map per train
    pub fn trains(&self) -> &[TimetableRow] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// One row of the regional tourism table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourismRow {
    pub description: String,
    /// Arrivals; `None` when the cell holds no number
    pub arrivals: Option<i64>,
    /// Presences (overnight stays); `None` when the cell holds no number
    pub present: Option<i64>,
}

/// Last row of the population statistics table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub cells: Vec<String>,
}

/// Persisted population snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub col1: Option<String>,
    pub col2: Option<String>,
    pub col3: Option<String>,
    pub timestamp: String,
}

impl PopulationSnapshot {
    pub fn from_row(row: &PopulationRow, timestamp: String) -> Self {
        let col = |idx: usize| row.cells.get(idx).filter(|c| !c.is_empty()).cloned();
        Self {
            col1: col(0),
            col2: col(1),
            col3: col(2),
            timestamp,
        }
    }
}

/// Tide extremes as returned by the tide API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideReport {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: Value,
}

/// Tide report for a `start..end` date window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideWindow {
    pub start: String,
    pub end: String,
    pub report: TideReport,
}

//! Upstream endpoints
//!
//! Every upstream is reached through a fixed URL shape; only the host part
//! is configurable so tests can point sources at a mock server.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::models::{TrainDirection, TransitMode};
use crate::time::flight_hour_bucket;

/// Station place id of Venezia Santa Lucia on the train monitor
pub const TRAIN_PLACE_ID: u32 = 3009;

/// Airport code queried on the flight tracker
pub const AIRPORT_CODE: &str = "VCE";

/// Pollutants requested from the air-quality API
pub const AIR_QUALITY_HOURLY: &str = "pm10,pm2_5,carbon_monoxide,carbon_dioxide,nitrogen_dioxide,sulphur_dioxide,ozone,uv_index,ammonia,methane";

/// Sources configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub flight_tracker_base: String,
    pub train_monitor_base: String,
    pub transit_base: String,
    pub tide_base: String,
    /// Sent verbatim in the `Authorization` header
    pub tide_api_key: String,
    pub air_quality_base: String,
    pub tourism_base: String,
    /// Full page URL, not a base
    pub population_url: String,

    pub tide_point: GeoPoint,
    pub air_quality_point: GeoPoint,

    pub bus_stops: Vec<String>,
    pub boat_stops: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            flight_tracker_base: "https://www.flightstats.com".to_string(),
            train_monitor_base: "https://iechub.rfi.it".to_string(),
            transit_base: "https://orari.actv.it".to_string(),
            tide_base: "https://api.stormglass.io".to_string(),
            tide_api_key: String::new(),
            air_quality_base: "https://air-quality-api.open-meteo.com".to_string(),
            tourism_base: "https://statistica.regione.veneto.it".to_string(),
            population_url:
                "https://portale.comune.venezia.it/millefoglie/statistiche/scheda/QUARTIERE-POPOLA-2$1$--------"
                    .to_string(),
            tide_point: GeoPoint {
                lat: 45.4408,
                lng: 12.3155,
            },
            air_quality_point: GeoPoint {
                lat: 45.437191,
                lng: 12.334590,
            },
            bus_stops: [
                "503", "501", "505", "506", "507", "508", "509", "510", "511", "512", "6084",
                "8044", "514", "515", "516", "517",
            ]
            .map(String::from)
            .to_vec(),
            boat_stops: ["5029", "5028", "5027", "5104", "5112", "5030", "5031"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl SourcesConfig {
    /// Stop ids queried for a transit mode
    pub fn stops(&self, mode: TransitMode) -> &[String] {
        match mode {
            TransitMode::Bus => &self.bus_stops,
            TransitMode::Boat => &self.boat_stops,
        }
    }
}

/// URL builder over validated bases
#[derive(Debug, Clone)]
pub struct SourceUrls {
    flight_tracker: String,
    train_monitor: String,
    transit: String,
    tide: String,
    air_quality: String,
    tourism: String,
    population: String,
    tide_point: GeoPoint,
    air_quality_point: GeoPoint,
}

impl SourceUrls {
    /// # Errors
    ///
    /// Returns a config error if any base is not an absolute URL
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        Ok(Self {
            flight_tracker: base(&config.flight_tracker_base)?,
            train_monitor: base(&config.train_monitor_base)?,
            transit: base(&config.transit_base)?,
            tide: base(&config.tide_base)?,
            air_quality: base(&config.air_quality_base)?,
            tourism: base(&config.tourism_base)?,
            population: base(&config.population_url)?,
            tide_point: config.tide_point,
            air_quality_point: config.air_quality_point,
        })
    }

    /// Flight-tracker board for the 6-hour window containing `hour`
    pub fn flights(&self, is_arrival: bool, year: i32, month: u32, day: u32, hour: u32) -> String {
        let kind = if is_arrival { "arrivals" } else { "departures" };
        format!(
            "{}/v2/flight-tracker/{kind}/{AIRPORT_CODE}/?year={year}&month={month}&date={day}&hour={}",
            self.flight_tracker,
            flight_hour_bucket(hour)
        )
    }

    pub fn trains(&self, direction: TrainDirection) -> String {
        let flag = if direction.is_arrivals() { "True" } else { "False" };
        format!(
            "{}/ArriviPartenze/ArrivalsDepartures/Monitor?placeId={TRAIN_PLACE_ID}&arrivals={flag}",
            self.train_monitor
        )
    }

    /// Stop times for `stop_id` on `date` (`YYYY-MM-DD`)
    pub fn transit(&self, date: &str, mode: TransitMode, stop_id: &str) -> String {
        format!(
            "{}/getStopSingle/{date}/{}/{stop_id}",
            self.transit,
            mode.segment()
        )
    }

    pub fn tides(&self, start: &str, end: &str) -> String {
        format!(
            "{}/v2/tide/extremes/point?lat={}&lng={}&start={start}&end={end}",
            self.tide, self.tide_point.lat, self.tide_point.lng
        )
    }

    pub fn air_quality(&self) -> String {
        format!(
            "{}/v1/air-quality?latitude={}&longitude={}&hourly={AIR_QUALITY_HOURLY}",
            self.air_quality, self.air_quality_point.lat, self.air_quality_point.lng
        )
    }

    /// Yearly movement by accommodation type for the Veneto region
    pub fn tourism(&self, year: i32) -> String {
        format!(
            "{}/jsp/turi1.jsp?D0={year}&D1=REGIONE+VENETO&D2=00Totale+anno&D3=Movimento+annuale+per+tipo+di+esercizio&B1=Visualizza",
            self.tourism
        )
    }

    pub fn population(&self) -> &str {
        &self.population
    }
}

fn base(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|e| Error::config(format!("invalid source URL {raw:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::config(format!("unsupported scheme in {raw:?}")));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

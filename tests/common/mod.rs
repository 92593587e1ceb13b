//! Common test utilities
//!
//! Upstream page fixtures and a config whose every source points at one
//! mock server.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use chrono_tz::Europe::Rome;
use lagoon::config::Config;
use lagoon::crawler::FetchConfig;
use lagoon::time::{FixedClock, TimeService};
use wiremock::MockServer;

/// Load a file from `tests/fixtures`
pub fn load_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

/// 2026-03-10 10:30:00 in Venice
pub fn venice_morning() -> (Arc<TimeService>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()));
    let time = Arc::new(TimeService::with_clock(Rome, clock.clone()));
    (time, clock)
}

/// Config with every source on `server`, no pauses and small stop lists
pub fn config_for(server: &MockServer) -> Config {
    let uri = server.uri();
    let mut config = Config::default();

    config.fetch = FetchConfig::without_delays();
    config.fetch.timeout_secs = 5;
    config.batch.cooldown_ms = 0;

    config.sources.flight_tracker_base = uri.clone();
    config.sources.train_monitor_base = uri.clone();
    config.sources.transit_base = uri.clone();
    config.sources.tide_base = uri.clone();
    config.sources.tide_api_key = "tide-key".to_string();
    config.sources.air_quality_base = uri.clone();
    config.sources.tourism_base = uri.clone();
    config.sources.population_url = format!("{uri}/population");
    config.sources.bus_stops = vec!["503".to_string(), "501".to_string()];
    config.sources.boat_stops = vec!["5029".to_string()];

    config
}

/// Flight tracker page with two flights on the board
pub fn flight_page(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<script src="/static/app.js"></script>
<script>
  __NEXT_DATA__ = {{"props":{{"initialState":{{"flightTracker":{{"route":{{"header":{{"date":"10-Mar-2026","title":"{title}"}},"flights":[{{"carrier":{{"fs":"AZ","name":"ITA Airways"}},"flightNumber":"1467","departureTime":{{"time24":"07:05"}}}},{{"carrier":{{"fs":"FR","name":"Ryanair"}},"flightNumber":"282","departureTime":{{"time24":"07:40"}}}}]}}}},"app":{{"appHost":"https://www.flightstats.com"}}}}}}}};
  __NEXT_LOADED_PAGES__ = [];
</script>
</head>
<body><div id="__next"></div></body>
</html>"#
    )
}

pub const TRAIN_BOARD: &str = r#"<!DOCTYPE html>
<html>
<body>
<table id="tabella">
  <thead id="headerTabId">
    <tr>
      <th id="RCategoria">Categoria</th>
      <th id="RTreno">Treno</th>
      <th id="RStazione">Provenienza</th>
      <th id="ROrario">Orario</th>
      <th id="RBinario">Binario</th>
    </tr>
  </thead>
  <tbody id="bodyTabId">
    <tr>
      <td id="RCategoria"><img src="/Content/images/loghi/RV.png" alt="RV"></td>
      <td id="RTreno">2204</td>
      <td id="RStazione"><div>VERONA PORTA NUOVA</div></td>
      <td id="ROrario">10:42</td>
      <td id="RBinario"><div> 3 </div></td>
    </tr>
    <tr>
      <td id="RCategoria"><img src="/Content/images/loghi/FR.png" alt="FR"></td>
      <td id="RTreno">9417</td>
      <td id="RStazione"><div>MILANO CENTRALE</div></td>
      <td id="ROrario">10:55</td>
      <td id="RBinario"><div>7</div></td>
    </tr>
  </tbody>
</table>
</body>
</html>"#;

pub const TOURISM_PAGE: &str = r#"<html>
<body>
<table><tr><td>Regione Veneto - Movimento turistico</td></tr></table>
<table>
  <tr><td>Tipo di esercizio</td><td>Arrivi</td><td>Presenze</td></tr>
  <tr><td>Esercizi alberghieri</td><td>12.345.678</td><td>34.567.890</td></tr>
  <tr><td>Esercizi complementari</td><td>7.654.321</td><td>38.765.432</td></tr>
  <tr><td>Totale</td><td>20.000.000</td><td>73.333.322</td></tr>
</table>
</body>
</html>"#;

pub const POPULATION_PAGE: &str = r#"<html>
<body>
<table>
  <tr><th>Data</th><th>Centro storico</th><th>Totale comune</th></tr>
  <tr><td>31/12/2025</td><td>48.112</td><td>249.466</td></tr>
  <tr><td> 28/02/2026 </td><td> 47.903 </td><td> 248.921 </td></tr>
</table>
</body>
</html>"#;

/// Stop API answer with one line and two usable departures
pub fn stop_payload(line: &str) -> serde_json::Value {
    serde_json::json!([
        {
            "lines": [
                {
                    "lineName": line,
                    "linePath": "P.le Roma - Lido",
                    "stopTimes": [
                        {
                            "sTimeDeparture": "08:15:30",
                            "sNameNext": "Ferrovia",
                            "sTimeNext": "08:18:00",
                            "sNameTerminal": "Lido S.M.E.",
                            "sTimeTerminal": "08:52:00"
                        },
                        { "sTimeDeparture": "Undefined" },
                        { "sTimeDeparture": "08:45:00", "sNameNext": 12 }
                    ]
                }
            ]
        }
    ])
}

pub fn tide_payload() -> serde_json::Value {
    serde_json::json!({
        "data": [
            { "height": 0.41, "time": "2026-03-10T04:12:00+00:00", "type": "high" },
            { "height": -0.38, "time": "2026-03-10T10:31:00+00:00", "type": "low" }
        ],
        "meta": { "cost": 1, "dailyQuota": 10, "station": { "name": "venezia" } }
    })
}

pub fn air_quality_payload() -> serde_json::Value {
    serde_json::json!({
        "latitude": 45.4,
        "longitude": 12.3,
        "hourly_units": { "time": "iso8601", "pm10": "μg/m³" },
        "hourly": { "time": ["2026-03-10T00:00", "2026-03-10T01:00"], "pm10": [21.4, 19.8] }
    })
}
